use townsquare_core::lang;

pub fn run(key: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    match key {
        Some(key) => {
            let text = lang::get_string(key).ok_or_else(|| format!("unknown string: {key}"))?;
            println!("{text}");
        }
        None => {
            for (key, text) in lang::all() {
                println!("{key} = {text}");
            }
        }
    }
    Ok(())
}
