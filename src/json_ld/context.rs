use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context as AnyhowContext, Result, bail};
use serde_json::{Value as JsonValue, json};

use super::vocab::{self, Term, value_is_keyword};

const GEN_DELIMS: [char; 7] = [':', '/', '?', '#', '[', ']', '@'];

/// Active context: the term definitions used to expand and compact IRIs.
#[derive(Debug, Clone, Default)]
pub(crate) struct Context {
    pub(crate) vocab: Option<Term>,
    pub(crate) term_map: BTreeMap<String, Term>,
    pub(crate) prefixes: BTreeSet<String>,
}

impl Context {
    pub(crate) fn insert(&mut self, term: &str, definition: Term) {
        self.term_map.insert(term.to_owned(), definition);
    }
    pub(crate) fn has_term(&self, term: &str) -> bool {
        self.get_term(term).is_some()
    }
    pub(crate) fn get_term(&self, term: &str) -> Option<&Term> {
        self.term_map.get(term)
    }

    /// Expand a property key to an IRI or keyword. Returns `None` when the key
    /// does not map to anything in this context.
    pub(crate) fn expand_property(&self, key: &str) -> Option<Term> {
        if value_is_keyword(key) {
            return Some(Term::new_keyword(key));
        }
        if let Some(definition) = self.get_term(key) {
            return (!definition.is_null()).then(|| definition.clone());
        }
        if let Some((prefix, suffix)) = key.split_once(':') {
            if suffix.starts_with("//") {
                return Some(Term::new_iri(key));
            }
            if let Some(definition) = self.get_term(prefix).filter(|d| !d.is_null()) {
                return Some(definition.join(suffix));
            }
            return Some(Term::new_iri(key));
        }
        self.vocab.as_ref().map(|vocab| vocab.join(key))
    }

    /// Expand a `@type` value. Unmapped values are kept verbatim.
    pub(crate) fn expand_type(&self, value: &str) -> Term {
        self.expand_property(value)
            .unwrap_or_else(|| Term::new_iri(value))
    }

    /// Pick the shortest representation of `term` under this context: an exact
    /// term, a vocabulary relative name, a compact IRI, or the IRI itself.
    pub(crate) fn compact_iri(&self, term: &Term) -> String {
        if let Some(exact) = self.exact_term(term) {
            return exact.to_owned();
        }
        let Term::Iri(iri) = term else {
            return term.as_str().to_owned();
        };
        if let Some(rest) = self
            .vocab
            .as_ref()
            .and_then(|vocab| iri.strip_prefix(vocab.as_str()))
        {
            if !rest.is_empty() && !rest.contains(':') && !self.has_term(rest) {
                return rest.to_owned();
            }
        }
        let compact = self
            .prefixes
            .iter()
            .filter_map(|prefix| {
                let definition = self.get_term(prefix)?;
                if definition.is_keyword() || definition.is_null() {
                    return None;
                }
                let rest = iri.strip_prefix(definition.as_str())?;
                (!rest.is_empty()).then(|| format!("{prefix}:{rest}"))
            })
            .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        compact.unwrap_or_else(|| iri.to_string())
    }

    fn exact_term(&self, definition: &Term) -> Option<&str> {
        self.term_map
            .iter()
            .filter(|(_, d)| *d == definition)
            .map(|(term, _)| term.as_str())
            .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
    }
}

/// Normalize a `@context` entry to an array of context definitions.
pub(crate) fn normalize(context_def: &JsonValue) -> Result<Vec<JsonValue>> {
    match context_def {
        JsonValue::Array(contexts) => Ok(contexts.clone()),
        JsonValue::Null | JsonValue::String(_) | JsonValue::Object(_) => {
            Ok(vec![context_def.to_owned()])
        }
        _ => bail!("context should either be a string, an object, or an array of them"),
    }
}

impl TryFrom<&[JsonValue]> for Context {
    type Error = anyhow::Error;

    /// Convert local context definitions to an active context using the
    /// algorithm defined in https://www.w3.org/TR/json-ld11-api/#algorithm
    ///
    /// Processing is implemented just enough to create term definitions.
    /// Remote contexts must already be replaced with their definitions.
    fn try_from(contexts: &[JsonValue]) -> Result<Context> {
        let mut result = Context::default();
        for context in contexts {
            match context {
                // 4.1.2.5.1 override
                JsonValue::Null => {
                    result = Context::default();
                }
                // 4.1.2.5.2
                JsonValue::String(remote_context) => {
                    bail!("remote context {remote_context} was not loaded");
                }
                // 4.1.2.5.4
                JsonValue::Object(_) => {
                    process_context_definition(context, &mut result)?;
                }
                // 4.1.2.5.3
                _ => {
                    bail!("invalid local context (not null, string, or map)");
                }
            }
        }

        Ok(result)
    }
}

fn process_context_definition(context: &JsonValue, result: &mut Context) -> Result<()> {
    let mut defined = BTreeMap::new();
    let map = context
        .as_object()
        .context("context definition should be a JSON object")?;

    // 4.1.2.5.5
    match map.get("@version") {
        Some(JsonValue::Number(number)) => {
            if number.as_f64().unwrap_or_default() != 1.1 {
                bail!("invalid @version value {number}");
            }
        }
        Some(value) => {
            bail!("invalid @version value {value}");
        }
        None => {}
    }
    // skip @import

    // skip @base

    // 4.1.2.5.8
    match map.get("@vocab") {
        Some(JsonValue::Null) => {
            result.vocab = None;
        }
        Some(JsonValue::String(value)) => {
            result.vocab = Some(iri_expand(result, value, context, &mut defined)?);
        }
        Some(value) => bail!("invalid vocabulary mapping {value}"),
        None => {}
    }
    // 4.1.2.5.9
    match map.get("@language") {
        Some(JsonValue::Null | JsonValue::String(_)) | None => {}
        Some(value) => bail!("invalid default language {value}"),
    }
    // skip @direction

    // skip @propagate

    // 4.1.2.5.13
    for (key, value) in map {
        if [
            "@base",
            "@direction",
            "@import",
            "@language",
            "@propagate",
            "@protected",
            "@version",
            "@vocab",
        ]
        .contains(&key.as_str())
        {
            continue;
        }
        create_term_definition(result, context, key, value, &mut defined)?;
    }

    Ok(())
}

fn create_term_definition(
    result: &mut Context,
    context: &JsonValue,
    term: &str,
    value: &JsonValue,
    defined: &mut BTreeMap<String, bool>,
) -> Result<()> {
    // 4.2.2.1
    match defined.get(term) {
        Some(true) => return Ok(()),
        Some(false) => bail!("cyclic IRI mapping found"),
        _ => {}
    }
    // 4.2.2.2
    if term.is_empty() {
        bail!("invalid term definition (empty string)");
    }
    defined.insert(term.to_owned(), false);

    // skip @type rule - use json-ld-1.0 processing mode

    // 4.2.2.5
    if term.starts_with('@') && term.is_ascii() {
        bail!("keyword redefinition error");
    }
    // 4.2.2.6
    result.term_map.remove(term);
    result.prefixes.remove(term);

    let (value, simple_term) = match value {
        // 4.2.2.7
        JsonValue::Null => (json!({ "@id": null }), true),
        // 4.2.2.8
        JsonValue::String(string) => (json!({ "@id": string }), true),
        // 4.2.2.9
        JsonValue::Object(_) => (value.clone(), false),
        _ => bail!("invalid term definition error"),
    };

    // 4.2.2.11
    let mut prefix = false;
    let mut definition = Term::default();

    // skipping @protected processing
    // skipping @type processing
    // skipping @reverse processing

    match value.get("@id") {
        // 4.2.2.14.1
        Some(JsonValue::Null) => {}
        Some(JsonValue::String(id)) => {
            // 4.2.2.14.2.2
            if id.starts_with('@') && !value_is_keyword(id) {
                bail!("invalid keyword alias");
            }
            // 4.2.2.14.2.3
            definition = iri_expand(result, id, context, defined)?;
            if definition == vocab::CONTEXT {
                bail!("invalid keyword alias error (@context cannot be aliased)");
            }
            // 4.2.2.14.2.4
            if term.contains(':') || term.contains('/') {
                // 4.2.2.14.2.4.1
                defined.insert(term.to_owned(), true);
                // 4.2.2.14.2.4.2
                if definition != iri_expand(result, term, context, defined)? {
                    bail!("invalid IRI mapping (term mismatch)");
                }
            // 4.2.2.14.2.5
            } else if simple_term && definition.as_str().ends_with(GEN_DELIMS) {
                prefix = true;
            }
        }
        // 4.2.2.14.2.1
        Some(_) => bail!("invalid IRI mapping error (entry is not a string)"),
        None => {
            // 4.2.2.15
            if let Some((term_prefix, suffix)) = term.split_once(':') {
                if suffix.starts_with("//") {
                    definition = Term::new_iri(term);
                } else {
                    // 4.2.2.15.1
                    if let Some(prefix_value) = context.get(term_prefix) {
                        create_term_definition(result, context, term_prefix, prefix_value, defined)?;
                    }
                    // 4.2.2.15.2
                    definition = match result.get_term(term_prefix) {
                        Some(prefix_definition) => prefix_definition.join(suffix),
                        // 4.2.2.15.3
                        None => Term::new_iri(term),
                    };
                }
            // 4.2.2.16
            } else if term.contains('/') {
                definition = iri_expand(result, term, context, defined)?;
            // 4.2.2.18
            } else if let Some(vocab) = &result.vocab {
                definition = vocab.join(term);
            } else {
                bail!("invalid IRI mapping (no vocabulary mapping for {term})");
            }
        }
    }

    // skip @container
    // skip @index
    // skip @context
    // skip @language
    // skip @direction
    // skip @nest

    // 4.2.2.25
    match value.get("@prefix") {
        Some(JsonValue::Bool(is_prefix)) => {
            prefix = *is_prefix;
            if prefix && definition.is_keyword() {
                bail!("invalid term definition (keyword as prefix)");
            }
        }
        Some(_) => {
            bail!("invalid @prefix value")
        }
        _ => {}
    }

    if let Some(entries) = value.as_object() {
        for entry in entries.keys() {
            if ![
                "@id",
                "@reverse",
                "@container",
                "@context",
                "@direction",
                "@index",
                "@language",
                "@nest",
                "@prefix",
                "@protected",
                "@type",
            ]
            .contains(&entry.as_str())
            {
                bail!("invalid term definition (unknown keyword {entry})");
            }
        }
    }

    result.insert(term, definition);
    if prefix {
        result.prefixes.insert(term.to_owned());
    }
    defined.insert(term.to_owned(), true);

    Ok(())
}

fn iri_expand(
    active_context: &mut Context,
    value: &str,
    local_context: &JsonValue,
    defined: &mut BTreeMap<String, bool>,
) -> Result<Term> {
    // 5.2.2.1
    if value_is_keyword(value) {
        return Ok(Term::new_keyword(value));
    }
    // 5.2.2.3
    if let Some(entry_value) = local_context.get(value) {
        if defined.get(value).is_none() {
            create_term_definition(active_context, local_context, value, entry_value, defined)?;
        }
    }
    // 5.2.2.4 and 5.2.2.5, assume vocab is true
    if let Some(definition) = active_context.get_term(value) {
        return Ok(definition.clone());
    }
    if let Some((prefix, suffix)) = value.split_once(':') {
        // 5.2.2.6.2
        if suffix.starts_with("//") {
            return Ok(Term::new_iri(value));
        }
        // 5.2.2.6.3
        if let Some(prefix_value) = local_context.get(prefix) {
            if !matches!(defined.get(prefix), Some(true)) {
                create_term_definition(
                    active_context,
                    local_context,
                    prefix,
                    prefix_value,
                    defined,
                )?;
            }
        }
        // 5.2.2.6.4 - assume prefix is true
        if let Some(prefix_definition) = active_context.get_term(prefix) {
            return Ok(prefix_definition.join(suffix));
        }
        // 5.2.2.6.5 - assume IRI form
        return Ok(Term::new_iri(value));
    }
    // 5.2.2.7 - assume vocab is true
    if let Some(vocab) = &active_context.vocab {
        return Ok(vocab.join(value));
    }
    // skip document relative

    Ok(Term::new_iri(value))
}

/// Built-in definition served for the ActivityStreams namespace.
pub(crate) fn activitystreams_definition() -> JsonValue {
    json!({
        "@vocab": vocab::ACTIVITY_STREAMS_VOCAB.as_str(),
        "as": vocab::ACTIVITY_STREAMS_VOCAB.as_str(),
        "id": "@id",
        "type": "@type"
    })
}
