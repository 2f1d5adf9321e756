//! Runtime launch options and class-path assembly

use crate::config::RuntimeConfig;

/// Prefix of the class-path option
pub const CLASSPATH_OPTION: &str = "-Djava.class.path=";

/// Standard class-path variable
pub const CLASSPATH_VAR: &str = "CLASSPATH";

#[cfg(windows)]
pub const PATH_SEPARATOR: char = ';';
#[cfg(not(windows))]
pub const PATH_SEPARATOR: char = ':';

/// Options handed to a launcher
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchOptions {
    /// `-Djava.class.path=...`, when any class-path value was found
    pub class_path: Option<String>,
    /// `-D<name>=<value>` for the passthrough variable
    pub property: Option<String>,
    pub extra: Vec<String>,
    pub ignore_unrecognized: bool,
}

impl LaunchOptions {
    /// Assemble options from the process environment
    pub fn from_env(config: &RuntimeConfig) -> Self {
        Self::assemble(config, |name| std::env::var(name).ok())
    }

    /// Assemble options using `lookup` for environment variables
    pub fn assemble<F>(config: &RuntimeConfig, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |name: &str| -> Option<String> {
            if name.is_empty() {
                return None;
            }
            lookup(name).filter(|v| !v.is_empty())
        };

        let max = config.max_classpath_len;
        let mut buffer = String::from(CLASSPATH_OPTION);
        let mut added_extra = false;
        let mut added = false;

        if let Some(extra) = value(&config.classpath_var) {
            if extra.len() + buffer.len() + 3 < max {
                buffer.push_str(&extra);
                added_extra = true;
                added = true;
            }
        }
        if let Some(standard) = value(CLASSPATH_VAR) {
            if standard.len() + buffer.len() + 2 < max {
                if added_extra {
                    buffer.push(PATH_SEPARATOR);
                }
                buffer.push_str(&standard);
                added = true;
            }
        }

        let property = value(&config.passthrough_var)
            .map(|v| format!("-D{}={}", config.passthrough_var, v));

        Self {
            class_path: added.then_some(buffer),
            property,
            extra: config.extra_options.clone(),
            ignore_unrecognized: config.ignore_unrecognized,
        }
    }

    /// Option strings in launch order
    pub fn to_vec(&self) -> Vec<String> {
        self.class_path
            .iter()
            .chain(self.property.iter())
            .chain(self.extra.iter())
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.to_vec().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn assemble(vars: &[(&str, &str)], config: &RuntimeConfig) -> LaunchOptions {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        LaunchOptions::assemble(config, |name| vars.get(name).cloned())
    }

    #[test]
    fn test_no_variables_no_classpath() {
        let options = assemble(&[], &RuntimeConfig::default());
        assert_eq!(options.class_path, None);
        assert_eq!(options.property, None);
        assert!(options.is_empty());
    }

    #[test]
    fn test_extra_then_standard() {
        let options = assemble(
            &[("JEVRESP_CLASSPATH", "/opt/jevalresp.jar"), ("CLASSPATH", "/usr/lib/x.jar")],
            &RuntimeConfig::default(),
        );
        let expected = format!("-Djava.class.path=/opt/jevalresp.jar{}/usr/lib/x.jar", PATH_SEPARATOR);
        assert_eq!(options.class_path, Some(expected));
    }

    #[test]
    fn test_standard_alone_has_no_separator() {
        let options = assemble(&[("CLASSPATH", "/usr/lib/x.jar")], &RuntimeConfig::default());
        assert_eq!(options.class_path.as_deref(), Some("-Djava.class.path=/usr/lib/x.jar"));
    }

    #[test]
    fn test_empty_values_are_skipped() {
        let options = assemble(
            &[("JEVRESP_CLASSPATH", ""), ("CLASSPATH", ""), ("SEEDRESP", "")],
            &RuntimeConfig::default(),
        );
        assert!(options.is_empty());
    }

    #[test]
    fn test_length_bound() {
        let config = RuntimeConfig { max_classpath_len: 40, ..RuntimeConfig::default() };
        // prefix is 18 bytes: 18 + 19 + 3 = 40 is not below the bound
        let options = assemble(&[("JEVRESP_CLASSPATH", &"a".repeat(19))], &config);
        assert_eq!(options.class_path, None);

        let options = assemble(&[("JEVRESP_CLASSPATH", &"a".repeat(18))], &config);
        assert!(options.class_path.is_some());

        // the standard value is checked against the partially filled buffer
        let options = assemble(
            &[("JEVRESP_CLASSPATH", &"a".repeat(10)), ("CLASSPATH", &"b".repeat(11))],
            &config,
        );
        assert_eq!(options.class_path, Some(format!("{}{}", CLASSPATH_OPTION, "a".repeat(10))));
    }

    #[test]
    fn test_passthrough_property_and_order() {
        let config = RuntimeConfig {
            extra_options: vec!["-Xmx128m".into()],
            ..RuntimeConfig::default()
        };
        let options = assemble(&[("SEEDRESP", "/data/resp"), ("CLASSPATH", "x.jar")], &config);
        assert_eq!(
            options.to_vec(),
            vec![
                "-Djava.class.path=x.jar".to_string(),
                "-DSEEDRESP=/data/resp".to_string(),
                "-Xmx128m".to_string(),
            ]
        );
    }

    #[test]
    fn test_unnamed_variable_is_ignored() {
        let config = RuntimeConfig { classpath_var: String::new(), ..RuntimeConfig::default() };
        let options = assemble(&[("", "/should/not/appear")], &config);
        assert_eq!(options.class_path, None);
    }
}
