//! Property (`path=value`) and settings (`<type name=".." value=".."/>`)
//! sources. Both assign coerced values at hierarchic paths.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use crate::key::HierarchicKey;
use crate::literal::coerce_value;
use crate::value::{Node, Provenance};

/// `name["game"].rest`: a bracketed segment directly after the first name
/// selects a game.
static GAME_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^([^.\[\]"]+)(\["(?:[^"\\]|\\.)*"\].*)$"#).expect("valid game key regex")
});

static SETTING_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<(\w+)\s+name="([^"]*)"\s+value="([^"]*)"\s*/>"#)
        .expect("valid setting tag regex")
});

static XML_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid comment regex"));

/// Rewrite the game shorthand into an explicit `game` segment.
///
/// `sys["gamename"].rest` becomes `sys.game["gamename"].rest`. The folder
/// form `sys.folder["dir"].rest` already reads as `sys`, `folder`, `dir`,
/// `rest` and is left alone.
pub fn rewrite_key(path: &str) -> Cow<'_, str> {
    match GAME_KEY.captures(path) {
        Some(caps) => Cow::Owned(format!("{}.game{}", &caps[1], &caps[2])),
        None => Cow::Borrowed(path),
    }
}

/// Assign one `path=value` pair into `tree`.
fn assign(tree: &mut Node, path: &str, raw_value: &str, provenance: &Provenance) {
    let key = HierarchicKey::parse(&rewrite_key(path.trim()));
    if key.is_empty() {
        debug!(provenance = %provenance, "skipping property with empty path");
        return;
    }
    trace!(%key, "assigning property");
    tree.set(&key, coerce_value(raw_value, provenance));
}

/// Parse a property source: one `path=value` per line, `#` comments.
pub fn parse_properties(source: &str, provenance: &Provenance) -> Node {
    let mut tree = Node::map();
    for (line_num, line) in source.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.split_once('=') {
            Some((path, value)) => assign(&mut tree, path, value, provenance),
            None => debug!(
                provenance = %provenance,
                line = line_num + 1,
                "skipping property line without '=': {}",
                line
            ),
        }
    }
    tree
}

/// Decode the entities settings files use inside attribute values.
pub fn decode_entities(s: &str) -> String {
    s.replace("&quot;", "\"")
        .replace("%quot;", "\"")
        .replace("%quot", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Parse a settings source. Text that is not a setting tag is ignored.
pub fn parse_settings(source: &str, provenance: &Provenance) -> Node {
    let source = XML_COMMENT.replace_all(source, "");
    let mut tree = Node::map();
    for caps in SETTING_TAG.captures_iter(&source) {
        let name = decode_entities(&caps[2]);
        let value = decode_entities(&caps[3]);
        trace!(kind = &caps[1], %name, "read setting");
        assign(&mut tree, &name, &value, provenance);
    }
    tree
}
