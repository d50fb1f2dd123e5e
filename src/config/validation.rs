//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (groups and providers reference outbounds)
//! - Validate URLs and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use thiserror::Error;
use url::Url;

use crate::config::schema::{AppConfig, OutboundType};
use crate::health::checker::{MAX_INTERVAL, MAX_SAMPLING};

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid {field} URL '{value}'")]
    InvalidUrl { field: &'static str, value: String },

    #[error("sampling must be greater than zero")]
    ZeroSampling,

    #[error("interval_secs {value} exceeds the maximum of {max}")]
    IntervalTooLong { value: u64, max: u64 },

    #[error("sampling {value} exceeds the maximum of {max}")]
    SamplingTooLarge { value: usize, max: usize },

    #[error("duplicate outbound tag '{0}'")]
    DuplicateOutbound(String),

    #[error("duplicate provider tag '{0}'")]
    DuplicateProvider(String),

    #[error("proxy outbound '{0}' needs a url")]
    MissingProxyUrl(String),

    #[error("group '{0}' has no members")]
    EmptyGroup(String),

    #[error("group '{group}' selects '{selected}' which is not a member")]
    SelectedNotMember { group: String, selected: String },

    #[error("'{owner}' references unknown outbound '{tag}'")]
    UnknownOutbound { owner: String, tag: String },
}

/// Validate `config`, collecting every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let health = &config.health_check;

    if !is_http_url(&health.destination) {
        errors.push(ValidationError::InvalidUrl {
            field: "destination",
            value: health.destination.clone(),
        });
    }
    if !health.connectivity.is_empty() && !is_http_url(&health.connectivity) {
        errors.push(ValidationError::InvalidUrl {
            field: "connectivity",
            value: health.connectivity.clone(),
        });
    }
    if health.sampling == 0 {
        errors.push(ValidationError::ZeroSampling);
    }
    if health.interval_secs > MAX_INTERVAL.as_secs() {
        errors.push(ValidationError::IntervalTooLong {
            value: health.interval_secs,
            max: MAX_INTERVAL.as_secs(),
        });
    }
    if health.sampling > MAX_SAMPLING {
        errors.push(ValidationError::SamplingTooLarge {
            value: health.sampling,
            max: MAX_SAMPLING,
        });
    }

    let mut tags = HashSet::new();
    for outbound in &config.outbounds {
        if !tags.insert(outbound.tag.as_str()) {
            errors.push(ValidationError::DuplicateOutbound(outbound.tag.clone()));
        }
    }

    for outbound in &config.outbounds {
        match outbound.kind {
            OutboundType::Direct => {}
            OutboundType::Proxy => match outbound.url.as_deref() {
                None => errors.push(ValidationError::MissingProxyUrl(outbound.tag.clone())),
                Some(url) if Url::parse(url).is_err() => {
                    errors.push(ValidationError::InvalidUrl {
                        field: "proxy",
                        value: url.to_string(),
                    })
                }
                Some(_) => {}
            },
            OutboundType::Group => {
                if outbound.outbounds.is_empty() {
                    errors.push(ValidationError::EmptyGroup(outbound.tag.clone()));
                }
                for member in &outbound.outbounds {
                    if !tags.contains(member.as_str()) {
                        errors.push(ValidationError::UnknownOutbound {
                            owner: outbound.tag.clone(),
                            tag: member.clone(),
                        });
                    }
                }
                if let Some(selected) = &outbound.selected {
                    if !outbound.outbounds.contains(selected) {
                        errors.push(ValidationError::SelectedNotMember {
                            group: outbound.tag.clone(),
                            selected: selected.clone(),
                        });
                    }
                }
            }
        }
    }

    let mut providers = HashSet::new();
    for provider in &config.providers {
        if !providers.insert(provider.tag.as_str()) {
            errors.push(ValidationError::DuplicateProvider(provider.tag.clone()));
        }
        for tag in &provider.outbounds {
            if !tags.contains(tag.as_str()) {
                errors.push(ValidationError::UnknownOutbound {
                    owner: provider.tag.clone(),
                    tag: tag.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_http_url(value: &str) -> bool {
    Url::parse(value)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{OutboundConfig, ProviderConfig};

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
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&AppConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = AppConfig::default();
        config.health_check.destination = "not a url".into();
        config.health_check.sampling = 0;
        config.outbounds.push(outbound("a", OutboundType::Direct));
        config.outbounds.push(outbound("a", OutboundType::Direct));
        config.outbounds.push(outbound("p", OutboundType::Proxy));
        let mut group = outbound("g", OutboundType::Group);
        group.outbounds = vec!["a".into(), "ghost".into()];
        group.selected = Some("p".into());
        config.outbounds.push(group);
        config.providers.push(ProviderConfig {
            tag: "sub".into(),
            outbounds: vec!["missing".into()],
        });

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::ZeroSampling));
        assert!(errors.contains(&ValidationError::DuplicateOutbound("a".into())));
        assert!(errors.contains(&ValidationError::MissingProxyUrl("p".into())));
        assert!(errors.contains(&ValidationError::SelectedNotMember {
            group: "g".into(),
            selected: "p".into(),
        }));
        assert!(errors.contains(&ValidationError::UnknownOutbound {
            owner: "g".into(),
            tag: "ghost".into(),
        }));
        assert!(errors.contains(&ValidationError::UnknownOutbound {
            owner: "sub".into(),
            tag: "missing".into(),
        }));
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::InvalidUrl {
                field: "destination",
                ..
            }
        )));
        assert_eq!(errors.len(), 7);
    }

    #[test]
    fn test_interval_upper_bound() {
        let mut config = AppConfig::default();
        config.health_check.interval_secs = MAX_INTERVAL.as_secs();
        assert!(validate_config(&config).is_ok());

        config.health_check.interval_secs = u64::MAX;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::IntervalTooLong {
                value: u64::MAX,
                max: MAX_INTERVAL.as_secs(),
            }])
        );
    }

    #[test]
    fn test_sampling_upper_bound() {
        let mut config = AppConfig::default();
        config.health_check.sampling = MAX_SAMPLING;
        assert!(validate_config(&config).is_ok());

        config.health_check.sampling = MAX_SAMPLING + 1;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::SamplingTooLarge {
                value: MAX_SAMPLING + 1,
                max: MAX_SAMPLING,
            }])
        );
    }

    #[test]
    fn test_connectivity_url_optional() {
        let mut config = AppConfig::default();
        config.health_check.connectivity = "ftp://example.com".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);

        config.health_check.connectivity.clear();
        assert!(validate_config(&config).is_ok());
    }
}
