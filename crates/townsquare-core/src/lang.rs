//! English display strings of the feed plugin.

const STRINGS: &[(&str, &str)] = &[
    ("pluginname", "Ratingallocate support for townsquare block"),
    ("pluginnameadding", "Adding a Ratingallocate support subplugin"),
    ("pluginnameediting", "Editing a Ratingallocate support subplugin"),
    (
        "pluginnamesummary",
        "This subplugin allows the townsquare block to show events from ratingallocate.",
    ),
    (
        "pluginname_help",
        "This subplugin allows the townsquare block to show events from ratingallocate.",
    ),
];

/// Display text for `key`, if defined.
pub fn get_string(key: &str) -> Option<&'static str> {
    STRINGS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, text)| *text)
}

/// All `(key, text)` pairs in definition order.
pub fn all() -> &'static [(&'static str, &'static str)] {
    STRINGS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plugin_name() {
        assert_eq!(
            get_string("pluginname"),
            Some("Ratingallocate support for townsquare block")
        );
    }

    #[test]
    fn every_key_is_defined_once() {
        let keys: Vec<&str> = all().iter().map(|(k, _)| *k).collect();
        assert_eq!(
            keys,
            vec![
                "pluginname",
                "pluginnameadding",
                "pluginnameediting",
                "pluginnamesummary",
                "pluginname_help"
            ]
        );
    }

    #[test]
    fn unknown_key() {
        assert_eq!(get_string("pluginname_missing"), None);
    }
}
