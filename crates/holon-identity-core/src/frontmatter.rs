use std::path::Path;

use crate::error::IdentityError;
use crate::identity::Identity;

const DELIMITER: &str = "---";

/// Split a `HOLON.md` file into its identity and the markdown body that
/// follows the frontmatter block.
///
/// # Errors
/// Returns [`IdentityError::MalformedRecord`] when the content is not UTF-8,
/// has no opening delimiter, never closes the block, or carries YAML that does
/// not fit the identity shape.
pub fn parse_frontmatter(data: &[u8]) -> Result<(Identity, String), IdentityError> {
    let content = std::str::from_utf8(data)
        .map_err(|err| IdentityError::MalformedRecord(format!("content is not UTF-8: {err}")))?;

    let Some(rest) = content.strip_prefix(DELIMITER) else {
        return Err(IdentityError::MalformedRecord("no YAML frontmatter found".to_string()));
    };
    let rest = rest.strip_prefix('\n').unwrap_or(rest);

    let Some(end) = rest.find("\n---") else {
        return Err(IdentityError::MalformedRecord("unclosed YAML frontmatter".to_string()));
    };

    let yaml_block = &rest[..end];
    let body = &rest[end + 4..];

    let identity: Identity = serde_yaml::from_str(yaml_block)
        .map_err(|err| IdentityError::MalformedRecord(format!("YAML parse error: {err}")))?;

    Ok((identity, body.to_string()))
}

/// Render the complete `HOLON.md` content for an identity: the fixed-layout
/// frontmatter block followed by the body template.
#[must_use]
pub fn render_holon_md(identity: &Identity) -> String {
    format!(
        "{DELIMITER}\n\
         # Holon Identity v1\n\
         uuid: {uuid}\n\
         given_name: {given_name}\n\
         family_name: {family_name}\n\
         motto: {motto}\n\
         composer: {composer}\n\
         clade: {clade}\n\
         status: {status}\n\
         born: {born}\n\
         \n\
         # Lineage\n\
         parents: [{parents}]\n\
         reproduction: {reproduction}\n\
         \n\
         # Optional\n\
         aliases: [{aliases}]\n\
         \n\
         # Metadata\n\
         generated_by: {generated_by}\n\
         lang: {lang}\n\
         proto_status: {proto_status}\n\
         {DELIMITER}\n\
         \n\
         # {given_name_raw} {family_name_raw}\n\
         \n\
         > *\"{motto_raw}\"*\n\
         \n\
         ## Description\n\
         \n\
         <Describe what this holon does.>\n\
         \n\
         ## Introspection Notes\n\
         \n\
         <Any assumptions or ambiguities noted during creation.>\n",
        uuid = quote(&identity.uuid),
        given_name = quote(&identity.given_name),
        family_name = quote(&identity.family_name),
        motto = quote(&identity.motto),
        composer = quote(&identity.composer),
        clade = quote(&identity.clade),
        status = plain_or_quoted(&identity.status),
        born = quote(&identity.born),
        parents = join_quoted(&identity.parents),
        reproduction = quote(&identity.reproduction),
        aliases = join_quoted(&identity.aliases),
        generated_by = quote(&identity.generated_by),
        lang = quote(&identity.lang),
        proto_status = plain_or_quoted(&identity.proto_status),
        given_name_raw = identity.given_name,
        family_name_raw = identity.family_name,
        motto_raw = identity.motto,
    )
}

/// Render an identity and write it to `path`. The write is not atomic: a
/// failure midway can leave a truncated file behind.
///
/// # Errors
/// Returns [`IdentityError::Io`] when the file cannot be created or written.
pub fn write_holon_md(identity: &Identity, path: &Path) -> Result<(), IdentityError> {
    std::fs::write(path, render_holon_md(identity))
        .map_err(|err| IdentityError::io("cannot write", path, err))?;
    tracing::info!(path = %path.display(), uuid = %identity.uuid, "wrote holon identity");
    Ok(())
}

/// YAML double-quoted scalar. Everything outside the YAML printable set, and
/// the characters a YAML reader would fold or strip, is written as `\uXXXX`.
fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for ch in value.chars() {
        match ch {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            ch if needs_escape(ch) => {
                quoted.push_str(&format!("\\u{:04X}", u32::from(ch)));
            }
            ch => quoted.push(ch),
        }
    }
    quoted.push('"');
    quoted
}

fn needs_escape(ch: char) -> bool {
    ch.is_control()
        || matches!(ch, '\u{2028}' | '\u{2029}' | '\u{feff}' | '\u{fffe}' | '\u{ffff}')
}

// `status` and `proto_status` are written bare when YAML reads them back as the
// same string.
fn plain_or_quoted(value: &str) -> String {
    const RESERVED: [&str; 9] = ["null", "true", "false", "yes", "no", "on", "off", "y", "n"];

    let mut chars = value.chars();
    let plain = chars.next().is_some_and(|first| first.is_ascii_alphabetic())
        && chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.'))
        && !RESERVED.iter().any(|word| word.eq_ignore_ascii_case(value));
    if plain {
        value.to_string()
    } else {
        quote(value)
    }
}

fn join_quoted(values: &[String]) -> String {
    values.iter().map(|value| quote(value)).collect::<Vec<_>>().join(", ")
}
