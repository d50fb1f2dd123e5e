//! Router view used by the health checker.
//!
//! # Responsibilities
//! - Resolve an outbound by tag (flat outbound set)
//! - Enumerate outbound providers
//! - Expose the optional shared history sink (UI display)

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::schema::{AppConfig, OutboundConfig, OutboundType};
use crate::health::history::HistorySink;
use crate::outbound::{Group, Outbound, OutboundProvider, StaticProvider};

/// Tag of the provider created when the configuration declares none.
pub const DEFAULT_PROVIDER: &str = "default";

/// What the health checker needs from the proxy router.
pub trait Router: Send + Sync {
    /// Look up an outbound in the router's flat outbound set.
    fn outbound(&self, tag: &str) -> Option<Arc<Outbound>>;

    /// All outbound providers.
    fn providers(&self) -> Vec<Arc<dyn OutboundProvider>>;

    /// Shared history mirrored by every checker, if a UI server runs.
    fn history_sink(&self) -> Option<Arc<dyn HistorySink>> {
        None
    }
}

/// Router over a fixed set of outbounds and providers.
#[derive(Default)]
pub struct StaticRouter {
    outbounds: HashMap<String, Arc<Outbound>>,
    providers: Vec<Arc<dyn OutboundProvider>>,
    history: Option<Arc<dyn HistorySink>>,
}

impl StaticRouter {
    pub fn new(outbounds: Vec<Arc<Outbound>>, providers: Vec<Arc<dyn OutboundProvider>>) -> Self {
        Self {
            outbounds: outbounds
                .into_iter()
                .map(|o| (o.tag().to_string(), o))
                .collect(),
            providers,
            history: None,
        }
    }

    /// Attach a history sink shared with UI consumers.
    pub fn with_history(mut self, history: Arc<dyn HistorySink>) -> Self {
        self.history = Some(history);
        self
    }

    /// Build outbounds and ready providers from a validated configuration.
    ///
    /// Without `[[providers]]`, every outbound goes into one provider named
    /// [`DEFAULT_PROVIDER`].
    pub fn from_config(config: &AppConfig) -> Self {
        let outbounds: Vec<Arc<Outbound>> = config
            .outbounds
            .iter()
            .filter_map(build_outbound)
            .map(Arc::new)
            .collect();
        let by_tag: HashMap<&str, &Arc<Outbound>> =
            outbounds.iter().map(|o| (o.tag(), o)).collect();

        let providers: Vec<Arc<dyn OutboundProvider>> = if config.providers.is_empty() {
            vec![Arc::new(StaticProvider::ready(DEFAULT_PROVIDER, outbounds.clone()))]
        } else {
            config
                .providers
                .iter()
                .map(|p| {
                    let members = p
                        .outbounds
                        .iter()
                        .filter_map(|tag| by_tag.get(tag.as_str()).map(|o| Arc::clone(o)))
                        .collect();
                    Arc::new(StaticProvider::ready(p.tag.clone(), members))
                        as Arc<dyn OutboundProvider>
                })
                .collect()
        };

        Self::new(outbounds, providers)
    }
}

fn build_outbound(config: &OutboundConfig) -> Option<Outbound> {
    match config.kind {
        OutboundType::Direct => Some(Outbound::direct(config.tag.clone())),
        OutboundType::Proxy => {
            let url = config.url.as_deref().unwrap_or_default();
            match url.parse() {
                Ok(url) => Some(Outbound::proxy(config.tag.clone(), url)),
                Err(e) => {
                    tracing::warn!(
                        outbound = %config.tag,
                        error = %e,
                        "Skipping proxy with invalid URL"
                    );
                    None
                }
            }
        }
        OutboundType::Group => Some(Outbound::group(
            config.tag.clone(),
            Group::new(config.outbounds.clone(), config.selected.clone()),
        )),
    }
}

impl Router for StaticRouter {
    fn outbound(&self, tag: &str) -> Option<Arc<Outbound>> {
        self.outbounds.get(tag).cloned()
    }

    fn providers(&self) -> Vec<Arc<dyn OutboundProvider>> {
        self.providers.clone()
    }

    fn history_sink(&self) -> Option<Arc<dyn HistorySink>> {
        self.history.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ProviderConfig;

    fn outbound(tag: &str, kind: OutboundType) -> OutboundConfig {
        OutboundConfig {
            tag: tag.into(),
            kind,
            url: None,
            outbounds: Vec::new(),
            selected: None,
        }
    }

    #[test]
    fn test_from_config_default_provider() {
        let mut config = AppConfig::default();
        config.outbounds.push(outbound("direct", OutboundType::Direct));
        let mut proxy = outbound("p", OutboundType::Proxy);
        proxy.url = Some("http://127.0.0.1:3128".into());
        config.outbounds.push(proxy);

        let router = StaticRouter::from_config(&config);
        assert!(router.outbound("direct").is_some());
        assert!(router.outbound("p").is_some());

        let providers = router.providers();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].tag(), DEFAULT_PROVIDER);
        assert_eq!(providers[0].outbounds().len(), 2);
    }

    #[test]
    fn test_from_config_named_providers() {
        let mut config = AppConfig::default();
        config.outbounds.push(outbound("a", OutboundType::Direct));
        config.outbounds.push(outbound("b", OutboundType::Direct));
        let mut group = outbound("auto", OutboundType::Group);
        group.outbounds = vec!["a".into(), "b".into()];
        config.outbounds.push(group);
        config.providers.push(ProviderConfig {
            tag: "sub".into(),
            outbounds: vec!["b".into(), "auto".into()],
        });

        let router = StaticRouter::from_config(&config);
        let providers = router.providers();
        assert_eq!(providers.len(), 1);
        assert!(providers[0].outbound("a").is_none());
        assert!(providers[0].outbound("auto").unwrap().is_group());
        assert_eq!(
            router.outbound("auto").unwrap().as_group().unwrap().selected().as_str(),
            "a"
        );
    }
}
