use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Term {
    Iri(Cow<'static, str>),
    Keyword(Cow<'static, str>),
}

/// An empty IRI marks a term explicitly mapped to `null`.
impl Default for Term {
    fn default() -> Self {
        Term::Iri(Cow::default())
    }
}

impl Term {
    pub(crate) fn new_keyword(keyword: &str) -> Term {
        Term::Keyword(Cow::Owned(keyword.to_owned()))
    }

    pub(crate) const fn const_keyword(keyword: &'static str) -> Term {
        Term::Keyword(Cow::Borrowed(keyword))
    }

    pub(crate) fn new_iri(iri: &str) -> Term {
        Term::Iri(Cow::Owned(iri.to_owned()))
    }

    pub(crate) const fn const_iri(iri: &'static str) -> Term {
        Term::Iri(Cow::Borrowed(iri))
    }

    pub(crate) fn as_str(&self) -> &str {
        match self {
            Term::Iri(iri) => iri,
            Term::Keyword(keyword) => keyword,
        }
    }

    pub(crate) fn is_keyword(&self) -> bool {
        matches!(self, Term::Keyword(_))
    }

    pub(crate) fn is_null(&self) -> bool {
        matches!(self, Term::Iri(iri) if iri.is_empty())
    }

    /// Append `suffix` to an IRI. Keywords are returned unchanged since they
    /// cannot act as prefixes.
    pub(crate) fn join(&self, suffix: &str) -> Term {
        match self {
            Term::Iri(iri) => Term::Iri(Cow::Owned(format!("{iri}{suffix}"))),
            Term::Keyword(_) => self.clone(),
        }
    }
}

pub(crate) const CONTEXT: Term = Term::const_keyword("@context");
pub(crate) const ID: Term = Term::const_keyword("@id");
pub(crate) const TYPE: Term = Term::const_keyword("@type");

pub(crate) const ACTIVITY_STREAMS_NS: &str = "https://www.w3.org/ns/activitystreams";
pub(crate) const ACTIVITY_STREAMS_VOCAB: Term =
    Term::const_iri("https://www.w3.org/ns/activitystreams#");

pub(crate) fn value_is_keyword(value: &str) -> bool {
    [
        "@base",
        "@container",
        "@context",
        "@direction",
        "@graph",
        "@id",
        "@import",
        "@include",
        "@index",
        "@json",
        "@language",
        "@list",
        "@nest",
        "@none",
        "@prefix",
        "@propagate",
        "@protected",
        "@reverse",
        "@set",
        "@type",
        "@value",
        "@version",
        "@vocab",
    ]
    .contains(&value)
}
