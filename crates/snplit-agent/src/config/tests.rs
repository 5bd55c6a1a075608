#[cfg(test)]
mod tests {
    use super::super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.ncbi.eutils_base, "https://eutils.ncbi.nlm.nih.gov/entrez/eutils");
        assert_eq!(config.unpaywall.base_url, "https://api.unpaywall.org/v2");
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.pipeline.temp_dir_prefix, "pdf_processing_");
        assert!(config.ncbi.api_key.is_none());
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [unpaywall]
            email = "lab@example.org"

            [http]
            max_redirects = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.unpaywall.email, "lab@example.org");
        assert_eq!(config.unpaywall.base_url, default_unpaywall_base());
        assert_eq!(config.http.max_redirects, 3);
        assert_eq!(config.http.timeout_secs, default_timeout_secs());
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = Config::default();
        config.ncbi.api_key = Some("from-file".into());
        let env = HashMap::from([
            ("NCBI_API_KEY", "from-env".to_string()),
            ("UNPAYWALL_EMAIL", "   ".to_string()),
        ]);
        config.apply_env_overrides(|k| env.get(k).cloned());
        assert_eq!(config.ncbi.api_key.as_deref(), Some("from-env"));
        // Blank values do not clobber the configured email.
        assert_eq!(config.unpaywall.email, default_unpaywall_email());
    }

    #[test]
    fn test_load_from_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_from(&dir.path().join("snplit.toml")).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snplit.toml");
        std::fs::write(&path, "[pipeline]\ntemp_dir_prefix = \"batch_\"\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.pipeline.temp_dir_prefix, "batch_");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("snplit.toml")).unwrap();
        assert_eq!(config.unpaywall.email, default_unpaywall_email());
        assert_eq!(config.http.max_redirects, default_max_redirects());
    }

    #[test]
    fn test_malformed_file_is_an_error_not_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snplit.toml");
        std::fs::write(&path, "[http\ntimeout_secs = 5\n").unwrap();

        let err = Config::load_or_default(&path).unwrap_err();
        assert!(err.to_string().starts_with("parsing "));
        assert!(err.to_string().contains("snplit.toml"));
    }
}
