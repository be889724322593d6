//! Read-through cache over `tmux show-options`.
//!
//! Options are fetched once per scope per process and parsed out of tmux's
//! quoted representation. The cache is owned by the value, not a global:
//! one selection session holds exactly one of these.

use anyhow::{Context, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use tracing::debug;

use super::{Tmux, TmuxResult};

/// Option cache keyed by the show-options scope flag (`g`, `s`, ...).
pub struct OptionCache<'a> {
    tmux: &'a Tmux,
    scope: String,
    cache: RefCell<HashMap<String, HashMap<String, String>>>,
}

impl<'a> OptionCache<'a> {
    /// Cache over the global scope, which is where plugin options live.
    pub fn global(tmux: &'a Tmux) -> OptionCache<'a> {
        OptionCache {
            tmux,
            scope: "g".to_string(),
            cache: RefCell::new(HashMap::new()),
        }
    }

    fn fetch(&self) -> TmuxResult<()> {
        if self.cache.borrow().contains_key(&self.scope) {
            return Ok(());
        }
        let flag = format!("-{}", self.scope);
        let raw = self.tmux.run(&["show-options", &flag])?;
        let mut opts = HashMap::new();
        for row in raw.lines().filter(|l| !l.is_empty()) {
            match row.split_once(' ') {
                Some((name, value)) => {
                    opts.insert(name.to_string(), parse_option_value(value));
                }
                // A bare flag option reads as enabled.
                None => {
                    opts.insert(row.to_string(), "on".to_string());
                }
            }
        }
        debug!(scope = %self.scope, count = opts.len(), "fetched tmux options");
        self.cache.borrow_mut().insert(self.scope.clone(), opts);
        Ok(())
    }

    pub fn get(&self, name: &str) -> TmuxResult<Option<String>> {
        self.fetch()?;
        Ok(self
            .cache
            .borrow()
            .get(&self.scope)
            .and_then(|opts| opts.get(name))
            .cloned())
    }

    pub fn get_or(&self, name: &str, default: &str) -> TmuxResult<String> {
        Ok(self.get(name)?.unwrap_or_else(|| default.to_string()))
    }

    /// An indexed option list: the bare name first if set, then `name[0]`,
    /// `name[1]`, ... (or `name-0`, `name-1`, ... for user options) until
    /// the first gap.
    pub fn get_list(&self, name: &str, user_suffix: bool) -> TmuxResult<Vec<String>> {
        let mut values = Vec::new();
        if let Some(v) = self.get(name)? {
            values.push(v);
        }
        for i in 0.. {
            let indexed = if user_suffix {
                format!("{name}-{i}")
            } else {
                format!("{name}[{i}]")
            };
            match self.get(&indexed)? {
                Some(v) => values.push(v),
                None => break,
            }
        }
        Ok(values)
    }

    pub fn get_bool(&self, name: &str, default: bool) -> TmuxResult<bool> {
        Ok(match self.get(name)? {
            Some(v) => truthy(&v),
            None => default,
        })
    }

    pub fn get_usize(&self, name: &str, default: usize) -> Result<usize> {
        match self.get(name)? {
            Some(v) => v
                .parse::<usize>()
                .with_context(|| format!("option {name} is not a number: {v:?}")),
            None => Ok(default),
        }
    }

    pub fn get_f64(&self, name: &str, default: f64) -> Result<f64> {
        match self.get(name)? {
            Some(v) => v
                .parse::<f64>()
                .with_context(|| format!("option {name} is not a number: {v:?}")),
            None => Ok(default),
        }
    }
}

/// tmux truthiness: everything except the classic "off" spellings.
pub fn truthy(value: &str) -> bool {
    !matches!(
        value.to_ascii_lowercase().as_str(),
        "" | "off" | "no" | "false" | "0"
    )
}

/// Undo tmux's value quoting: an enclosing single/double quote pair and
/// backslash escapes.
pub fn parse_option_value(raw: &str) -> String {
    let mut value = raw;
    let bytes = value.as_bytes();
    if bytes.len() > 1
        && ((bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\''))
    {
        value = &value[1..value.len() - 1];
    }
    if !value.contains('\\') {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len());
    let mut escaped = false;
    for c in value.chars() {
        if escaped {
            out.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_values_are_unwrapped() {
        assert_eq!(parse_option_value("\"a b\""), "a b");
        assert_eq!(parse_option_value("'x'"), "x");
        assert_eq!(parse_option_value("plain"), "plain");
        // A lone quote is content, not quoting.
        assert_eq!(parse_option_value("\""), "\"");
    }

    #[test]
    fn backslash_escapes_are_applied() {
        assert_eq!(parse_option_value(r"a\\b"), r"a\b");
        assert_eq!(parse_option_value(r"'a\;b'"), "a;b");
    }

    #[test]
    fn truthiness_matches_tmux_spellings() {
        for v in ["on", "1", "yes", "anything"] {
            assert!(truthy(v), "{v} should be true");
        }
        for v in ["", "off", "no", "false", "0", "OFF"] {
            assert!(!truthy(v), "{v} should be false");
        }
    }
}
