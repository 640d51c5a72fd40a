//! Application name transforms.

/// Name used when provisioning hosted remotes: hyphens and spaces become underscores.
pub fn clean_app_name(app_name: &str) -> String {
    app_name.replace(['-', ' '], "_")
}

/// Base database name: hyphens become underscores, everything else is kept.
pub fn database_base_name(app_name: &str) -> String {
    app_name.replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_app_name_replaces_spaces_and_hyphens() {
        assert_eq!(clean_app_name("My App"), "My_App");
        assert_eq!(clean_app_name("blog-app"), "blog_app");
        assert_eq!(clean_app_name("a- b"), "a__b");
    }

    #[test]
    fn database_base_name_only_replaces_hyphens() {
        assert_eq!(database_base_name("blog-app"), "blog_app");
        assert_eq!(database_base_name("My App"), "My App");
    }
}
