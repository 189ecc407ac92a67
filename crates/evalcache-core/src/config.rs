use serde::{Deserialize, Serialize};

use crate::error::{CacheError, CacheResult};
use crate::key::{EpsilonKeyGenerator, ExactKeyGenerator, KeyGenerator, DEFAULT_EPSILON};
use crate::local::LOCAL_KIND;

/// Construction settings for a cache built by the factory.
///
/// ```yaml
/// kind: Local
/// key_generator:
///   kind: epsilon
///   epsilon: 1.0e-8
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Factory name of the cache. Default: "Local".
    pub kind: String,

    /// How domain points become keys.
    pub key_generator: KeyGeneratorConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            kind: LOCAL_KIND.to_string(),
            key_generator: KeyGeneratorConfig::default(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeyGeneratorConfig {
    Exact,
    Epsilon {
        #[serde(default = "default_epsilon")]
        epsilon: f64,
    },
}

fn default_epsilon() -> f64 {
    DEFAULT_EPSILON
}

impl Default for KeyGeneratorConfig {
    fn default() -> Self {
        Self::Epsilon {
            epsilon: DEFAULT_EPSILON,
        }
    }
}

impl KeyGeneratorConfig {
    pub fn build(&self) -> CacheResult<Box<dyn KeyGenerator>> {
        match self {
            Self::Exact => Ok(Box::new(ExactKeyGenerator)),
            Self::Epsilon { epsilon } => Ok(Box::new(EpsilonKeyGenerator::new(*epsilon)?)),
        }
    }
}

impl CacheConfig {
    pub fn from_yaml_str(source: &str) -> CacheResult<Self> {
        let config: Self = serde_yaml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CacheResult<()> {
        if self.kind.trim().is_empty() {
            return Err(CacheError::Config {
                message: "'kind' must name a cache".to_string(),
            });
        }
        if let KeyGeneratorConfig::Epsilon { epsilon } = self.key_generator {
            if !epsilon.is_finite() || epsilon < 0.0 {
                return Err(CacheError::Config {
                    message: format!(
                        "'key_generator.epsilon' must be finite and non-negative, got {}",
                        epsilon
                    ),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = CacheConfig::default();
        assert_eq!(cfg.kind, "Local");
        assert_eq!(
            cfg.key_generator,
            KeyGeneratorConfig::Epsilon {
                epsilon: DEFAULT_EPSILON
            }
        );
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_parse_yaml() {
        let cfg = CacheConfig::from_yaml_str("key_generator:\n  kind: epsilon\n  epsilon: 0.001\n")
            .unwrap();
        assert_eq!(cfg.kind, "Local");
        assert_eq!(
            cfg.key_generator,
            KeyGeneratorConfig::Epsilon { epsilon: 0.001 }
        );

        let exact = CacheConfig::from_yaml_str("kind: Local\nkey_generator:\n  kind: exact\n").unwrap();
        assert_eq!(exact.key_generator, KeyGeneratorConfig::Exact);
        assert_eq!(exact.key_generator.build().unwrap().name(), "Exact");
    }

    #[test]
    fn test_epsilon_defaults_when_omitted() {
        let cfg = CacheConfig::from_yaml_str("key_generator:\n  kind: epsilon\n").unwrap();
        assert_eq!(
            cfg.key_generator,
            KeyGeneratorConfig::Epsilon {
                epsilon: DEFAULT_EPSILON
            }
        );
    }

    #[test]
    fn test_rejects_negative_epsilon() {
        let err = CacheConfig::from_yaml_str("key_generator:\n  kind: epsilon\n  epsilon: -1.0\n")
            .unwrap_err();
        assert!(matches!(err, CacheError::Config { .. }));
    }

    #[test]
    fn test_rejects_unknown_generator() {
        let err = CacheConfig::from_yaml_str("key_generator:\n  kind: grid\n").unwrap_err();
        assert!(err.to_string().starts_with("configuration error"));
    }
}
