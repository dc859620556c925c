use super::parser::ListParser;
use super::source::ListSource;
use futures::future::join_all;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use warden_dns_application::ports::GroupedRuleIndex;
use warden_dns_domain::config::BlockingConfig;
use warden_dns_domain::DomainError;

/// Rebuilds group snapshots from their configured sources.
///
/// Each group is refreshed through its own factory; if any source of a
/// group fails, that group's factory is dropped unfinished and the prior
/// snapshot stays visible. Other groups are unaffected.
pub struct ListRefresher {
    deny_index: Arc<dyn GroupedRuleIndex>,
    allow_index: Arc<dyn GroupedRuleIndex>,
    deny_sources: Vec<(Arc<str>, Vec<ListSource>)>,
    allow_sources: Vec<(Arc<str>, Vec<ListSource>)>,
    client: reqwest::Client,
    max_errors_per_source: usize,
}

impl ListRefresher {
    pub fn new(
        config: &BlockingConfig,
        deny_index: Arc<dyn GroupedRuleIndex>,
        allow_index: Arc<dyn GroupedRuleIndex>,
    ) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .user_agent("warden-dns (list-refresh)")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| DomainError::Internal(format!("http client: {e}")))?;

        Ok(Self {
            deny_index,
            allow_index,
            deny_sources: Self::parse_sources(&config.deny_groups),
            allow_sources: Self::parse_sources(&config.allow_groups),
            client,
            max_errors_per_source: config.max_errors_per_source,
        })
    }

    fn parse_sources(
        groups: &std::collections::HashMap<String, Vec<String>>,
    ) -> Vec<(Arc<str>, Vec<ListSource>)> {
        groups
            .iter()
            .map(|(group, specs)| {
                (
                    Arc::from(group.as_str()),
                    specs.iter().map(|s| ListSource::parse(s)).collect(),
                )
            })
            .collect()
    }

    /// Refresh every deny and allow group. Returns an error when at least
    /// one group failed; the failed groups keep their previous snapshots.
    pub async fn refresh_all(&self, cancel: &CancellationToken) -> Result<(), DomainError> {
        let deny_tasks = self
            .deny_sources
            .iter()
            .map(|(group, sources)| self.refresh_group(&self.deny_index, group, sources, cancel));
        let allow_tasks = self
            .allow_sources
            .iter()
            .map(|(group, sources)| self.refresh_group(&self.allow_index, group, sources, cancel));

        let results = join_all(deny_tasks.chain(allow_tasks)).await;

        let failed: Vec<String> = results
            .into_iter()
            .filter_map(|result| result.err().map(|e| e.to_string()))
            .collect();
        if failed.is_empty() {
            Ok(())
        } else {
            Err(DomainError::ListSource(failed.join("; ")))
        }
    }

    async fn refresh_group(
        &self,
        index: &Arc<dyn GroupedRuleIndex>,
        group: &Arc<str>,
        sources: &[ListSource],
        cancel: &CancellationToken,
    ) -> Result<(), DomainError> {
        let mut factory = index.refresh(group);

        for source in sources {
            let reader = source.open(&self.client).await.map_err(|e| {
                warn!(group = %group, source = %source.display(), error = %e, "List source failed");
                e
            })?;

            let source_name = source.display();
            let error_group = Arc::clone(group);
            let mut parser = ListParser::auto(reader)
                .with_max_errors(self.max_errors_per_source)
                .with_cancellation(cancel.clone())
                .with_error_callback(Box::new(move |e| {
                    warn!(group = %error_group, source = %source_name, error = %e, "Skipping rule");
                }));

            while let Some(entry) = parser.next_entry().await.map_err(|e| {
                warn!(group = %group, source = %source.display(), error = %e, "List source aborted");
                e
            })? {
                for rule in entry.into_rules() {
                    if !factory.add(&rule) {
                        warn!(group = %group, rule = %rule, "No index recognized rule");
                    }
                }
            }
        }

        factory.finish();
        info!(
            group = %group,
            elements = index.element_count(group),
            "Group refreshed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lists::index::{ChainedGroupedIndex, DomainGroupedIndex, IpGroupedIndex};
    use std::collections::HashMap;
    use std::io::Write;
    use warden_dns_application::ports::RuleQuery;

    fn write_list(dir: &tempfile::TempDir, name: &str, content: &str) -> String {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path.display().to_string()
    }

    fn chained() -> Arc<dyn GroupedRuleIndex> {
        Arc::new(ChainedGroupedIndex::new(vec![
            Arc::new(DomainGroupedIndex::new()),
            Arc::new(IpGroupedIndex::new()),
        ]))
    }

    fn config_with(deny: HashMap<String, Vec<String>>) -> BlockingConfig {
        BlockingConfig {
            deny_groups: deny,
            ..BlockingConfig::default()
        }
    }

    #[tokio::test]
    async fn test_refresh_builds_groups_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let ads = write_list(
            &dir,
            "ads.txt",
            "doubleclick.net\n*.tracker.net\n# comment\n203.0.113.7\n",
        );

        let deny = chained();
        let allow = chained();
        let refresher = ListRefresher::new(
            &config_with(HashMap::from([("ads".to_string(), vec![ads])])),
            Arc::clone(&deny),
            Arc::clone(&allow),
        )
        .unwrap();

        refresher
            .refresh_all(&CancellationToken::new())
            .await
            .unwrap();

        let groups: Vec<Arc<str>> = vec![Arc::from("ads")];
        assert!(!deny
            .contains(RuleQuery::Name("doubleclick.net"), &groups)
            .is_empty());
        assert!(!deny
            .contains(RuleQuery::Name("a.tracker.net"), &groups)
            .is_empty());
        assert!(!deny
            .contains(RuleQuery::Ip("203.0.113.7".parse().unwrap()), &groups)
            .is_empty());
        assert_eq!(deny.element_count("ads"), 3);
    }

    #[tokio::test]
    async fn test_failed_source_retains_prior_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_list(&dir, "good.txt", "keep.example.com\n");
        let missing = dir.path().join("missing.txt").display().to_string();

        let deny = chained();
        let allow = chained();

        let refresher = ListRefresher::new(
            &config_with(HashMap::from([("ads".to_string(), vec![good])])),
            Arc::clone(&deny),
            Arc::clone(&allow),
        )
        .unwrap();
        refresher
            .refresh_all(&CancellationToken::new())
            .await
            .unwrap();

        // Second refresh points at a missing file: it must fail and keep
        // the previous snapshot.
        let refresher = ListRefresher::new(
            &config_with(HashMap::from([("ads".to_string(), vec![missing])])),
            Arc::clone(&deny),
            Arc::clone(&allow),
        )
        .unwrap();
        let result = refresher.refresh_all(&CancellationToken::new()).await;
        assert!(result.is_err());

        let groups: Vec<Arc<str>> = vec![Arc::from("ads")];
        assert!(!deny
            .contains(RuleQuery::Name("keep.example.com"), &groups)
            .is_empty());
    }
}
