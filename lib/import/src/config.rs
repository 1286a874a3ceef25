use crate::fetch::{HttpFetch, ReqwestFetcher};
use crate::prospect::DataSource;
use crate::source::{SourceAdapter, SourceConfig};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;

/// Endpoints and client settings for an import run
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub erp_url: Option<String>,
    pub kueba_url: Option<String>,
    pub timeout: Duration,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            erp_url: None,
            kueba_url: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl ImportConfig {
    pub fn url_for(&self, source: DataSource) -> &str {
        let url = match source {
            DataSource::Erp => &self.erp_url,
            DataSource::Kueba => &self.kueba_url,
        };
        url.as_deref().unwrap_or("")
    }

    /// Source configs for `selected`, in the fixed import order.
    ///
    /// URLs are not validated here; an unusable URL surfaces as a config
    /// error when that source's stream is opened.
    pub fn sources(&self, selected: &[DataSource]) -> Vec<SourceConfig> {
        DataSource::ALL
            .into_iter()
            .filter(|source| selected.contains(source))
            .map(|source| SourceConfig::for_source(source, self.url_for(source)))
            .collect()
    }

    /// Adapters sharing one HTTP client
    pub fn adapters(&self, selected: &[DataSource]) -> Result<Vec<SourceAdapter>> {
        let fetcher: Arc<dyn HttpFetch> = Arc::new(ReqwestFetcher::new(self.timeout)?);
        Ok(self
            .sources(selected)
            .into_iter()
            .map(|config| SourceAdapter::new(config, fetcher.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sources_follow_fixed_order() {
        let config = ImportConfig {
            erp_url: Some("https://erp.example.test/users".into()),
            kueba_url: Some("https://people.example.test/api".into()),
            ..Default::default()
        };
        let sources: Vec<DataSource> = config
            .sources(&[DataSource::Kueba, DataSource::Erp])
            .iter()
            .map(|s| s.source)
            .collect();
        assert_eq!(sources, vec![DataSource::Erp, DataSource::Kueba]);

        let only_kueba = config.sources(&[DataSource::Kueba]);
        assert_eq!(only_kueba.len(), 1);
        assert_eq!(only_kueba[0].base_url, "https://people.example.test/api");
    }

    #[test]
    fn test_missing_url_is_empty() {
        let config = ImportConfig::default();
        assert_eq!(config.url_for(DataSource::Erp), "");
        assert_eq!(config.sources(&DataSource::ALL)[0].base_url, "");
    }
}
