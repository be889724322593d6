//! Anchored preset patterns for quick-select tiers.
//!
//! None of these are validators. They are tuned to match the common shapes
//! of each type while excluding the rarer forms that would pull in false
//! matches. Every preset is anchored: a hit counts only when bounded on
//! both sides by a delimiter or the buffer edge, and the boundary character
//! stays outside the captured span (group 1).

use once_cell::sync::Lazy;

static URLS: Lazy<String> = Lazy::new(url_pattern);
static ABSPATHS: Lazy<String> = Lazy::new(|| path_patterns().0);
static PATHS: Lazy<String> = Lazy::new(|| path_patterns().1);
static FILENAMES: Lazy<String> = Lazy::new(|| path_patterns().2);

/// Look up a preset pattern by name.
pub fn preset(name: &str) -> Option<&'static str> {
    match name {
        "urls" => Some(URLS.as_str()),
        "abspaths" => Some(ABSPATHS.as_str()),
        "paths" => Some(PATHS.as_str()),
        "filenames" => Some(FILENAMES.as_str()),
        _ => None,
    }
}

fn url_pattern() -> String {
    let edge = r#"[\[\]\s:=,#"{}()']"#;
    let leader = format!("(?:^|{edge})");
    let follower = format!("(?:$|{edge})");
    let proto = r"[a-zA-Z][a-zA-Z0-9]{1,5}://";
    let creds = r"[a-zA-Z0-9_]+(?::[a-zA-Z0-9_-]+)?@";
    let ipaddr = r"(?:[0-2]?[0-9]{1,2}\.){3}[0-2]?[0-9]{1,2}";
    let hostname = r"(?:[a-zA-Z0-9][\w-]*\.)*[a-zA-Z][\w-]*";
    let servname = format!("(?:{hostname}|{ipaddr})(?::[0-9]{{1,5}})?");
    // Parens show up in real-world URL paths; requiring them to pair keeps
    // a trailing ")" from a surrounding sentence out of the span.
    let token = r"(?:[\w.~%/&-]+|(?:[\w.~%/&-]*\([\w.~%/&-]*\)[\w.~%/&-]*)+)";
    let urlpath = format!("/{token}?/?");
    let kv = format!("{token}+(?:={token}?)?");
    let query = format!(r"\?(?:{kv}&)*(?:{kv})?");
    let fragment = format!("#(?:{kv}&)*(?:{kv})?");
    format!(
        "{leader}({proto}(?:{creds})?{servname}(?:{urlpath})?(?:{query})?(?:{fragment})?){follower}"
    )
}

/// Build (abspaths, paths, filenames).
///
/// Spaces are a common delimiter, so they are only allowed inside paths of
/// at least three elements, never in the first or last element, and only
/// one at a time.
fn path_patterns() -> (String, String, String) {
    let edge = r#"[\[\]\s:=,#$"{}<>()']"#;
    let edge_with_slash = r#"[\[\]\s:=,#$"{}<>()/']"#;
    let leader = format!("(?:^|{edge})");
    let leader_with_slash = format!("(?:^|{edge_with_slash})");
    let follower = format!("(?:$|{edge})");

    let path_el = r"(?:[a-zA-Z0-9_-]{1,30}|\.|\.\.)";
    let inner_el = r"[a-zA-Z0-9_-]{1,25}\\? [a-zA-Z0-9_-]{1,25}";
    let either_el = format!("(?:{path_el}|{inner_el})");
    let basic_filename = r"[a-zA-Z0-9_-]{1,30}\.[a-zA-Z][a-zA-Z0-9]{0,5}";
    let path_filename = format!(r"{either_el}\.[a-zA-Z0-9]{{1,6}}");
    let sep = r"[\\/]";
    let root = format!("(?:/|~/|[A-Z]:{sep})");

    let abspath = format!("{root}(?:{either_el}{sep})*(?:{path_filename}|{path_el}{sep}?)");
    let relpath2 = format!("{path_el}{sep}(?:{path_el}{sep}?|{path_filename})");
    let relpath3 = format!("{path_el}{sep}(?:{either_el}{sep})+(?:{path_el}{sep}?|{path_filename})");
    let anypath = format!("(?:{abspath}|{relpath2}|{relpath3})");

    (
        format!("{leader}({abspath}){follower}"),
        format!("{leader}({anypath}){follower}"),
        format!("{leader_with_slash}({basic_filename}){follower}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn group1(name: &str, text: &str) -> Option<String> {
        let re = Regex::new(preset(name).unwrap()).unwrap();
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    #[test]
    fn all_presets_compile() {
        for name in ["urls", "abspaths", "paths", "filenames"] {
            Regex::new(preset(name).unwrap()).unwrap();
        }
    }

    #[test]
    fn unknown_preset_is_none() {
        assert!(preset("emails").is_none());
    }

    #[test]
    fn filenames_capture_excludes_boundaries() {
        assert_eq!(group1("filenames", "see foo.txt here"), Some("foo.txt".into()));
        assert_eq!(group1("filenames", "foo.txt"), Some("foo.txt".into()));
        assert_eq!(group1("filenames", "(archive.tar)"), Some("archive.tar".into()));
    }

    #[test]
    fn urls_match_common_shapes() {
        assert_eq!(
            group1("urls", "fetch http://example.com/a_(b) next"),
            Some("http://example.com/a_(b)".into())
        );
        assert_eq!(
            group1("urls", "ftp://user:pw@10.0.0.1:21/dir/"),
            Some("ftp://user:pw@10.0.0.1:21/dir/".into())
        );
        assert_eq!(group1("urls", "not a url"), None);
    }

    #[test]
    fn paths_match_absolute_relative_and_home() {
        assert_eq!(group1("abspaths", "ls /usr/local/bin"), Some("/usr/local/bin".into()));
        assert_eq!(group1("abspaths", "cat ~/notes.md"), Some("~/notes.md".into()));
        assert_eq!(group1("paths", "in src/main.rs:10"), Some("src/main.rs".into()));
        assert_eq!(group1("abspaths", "plain words"), None);
    }
}
