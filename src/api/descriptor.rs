/// What a request path names: a collection (`/{type}`) or a member of one
/// (`/{type}/{id}`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Descriptor {
    pub(crate) ty: Option<String>,
    pub(crate) id: Option<String>,
    pub(crate) url: String,
    /// The path does not fit the `/{type}/{id}` shape.
    pub(crate) error: bool,
    origin: String,
}

impl Descriptor {
    pub(crate) fn parse(path: &str, public_url: &str) -> Descriptor {
        let segments: Vec<&str> = path.split('/').take(4).collect();
        let segment = |index: usize| {
            segments
                .get(index)
                .filter(|segment| !segment.is_empty())
                .map(|segment| segment.to_string())
        };
        let (ty, id, overflow) = match segments.len() {
            0 | 1 => (None, None, false),
            2 => (segment(1), None, false),
            3 => (segment(1), segment(2), false),
            _ => (segment(1), segment(2), true),
        };
        let (id, orphan) = match (&ty, id) {
            (None, Some(_)) => (None, true),
            (_, id) => (id, false),
        };
        Descriptor {
            ty,
            id,
            url: format!("{public_url}{path}"),
            error: overflow || orphan,
            origin: public_url.to_owned(),
        }
    }

    /// `/context/default`, where the default JSON-LD context is published.
    pub(crate) fn names_default_context(&self) -> bool {
        self.ty.as_deref() == Some("context") && self.id.as_deref() == Some("default")
    }

    pub(crate) fn collection_url(&self) -> Option<String> {
        let ty = self.ty.as_deref()?;
        Some(format!("{}/{ty}", self.origin))
    }
}
