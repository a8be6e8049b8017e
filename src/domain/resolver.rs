// src/domain/resolver.rs

/// An ordered list of candidate sources for a single display value.
///
/// Sources are tried in the order they were added; the first extractor that
/// yields a usable value wins. Strings count as usable when they are not blank.
/// When nothing matches, the fallback is returned.
pub struct PrioritizedResolver<'a, S: ?Sized, T> {
    sources: Vec<(&'static str, Box<dyn Fn(&S) -> Option<T> + 'a>)>,
    fallback: T,
}

/// The resolved value and the label of the source it came from
/// (`None` when the fallback was used).
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    pub source: Option<&'static str>,
}

impl<T> Resolved<T> {
    pub fn is_fallback(&self) -> bool {
        self.source.is_none()
    }
}

/// Whether a candidate value counts as present.
pub trait Usable {
    fn is_usable(&self) -> bool;
}

impl Usable for String {
    fn is_usable(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl Usable for &str {
    fn is_usable(&self) -> bool {
        !self.trim().is_empty()
    }
}

impl<'a, S: ?Sized, T: Usable + Clone> PrioritizedResolver<'a, S, T> {
    pub fn new(fallback: T) -> Self {
        Self {
            sources: Vec::new(),
            fallback,
        }
    }

    pub fn source<F>(mut self, label: &'static str, extract: F) -> Self
    where
        F: Fn(&S) -> Option<T> + 'a,
    {
        self.sources.push((label, Box::new(extract)));
        self
    }

    pub fn resolve(&self, subject: &S) -> Resolved<T> {
        self.sources
            .iter()
            .find_map(|(label, extract)| {
                extract(subject)
                    .filter(Usable::is_usable)
                    .map(|value| Resolved {
                        value,
                        source: Some(*label),
                    })
            })
            .unwrap_or_else(|| Resolved {
                value: self.fallback.clone(),
                source: None,
            })
    }
}
