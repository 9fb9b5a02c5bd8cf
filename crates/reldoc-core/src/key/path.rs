use crate::key::{KeyDecodeError, STEP, escape_into, unescape};
use std::fmt::{self, Display};

///
/// PathStep
/// One nesting level below a top-level field.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum PathStep {
    /// Position inside a list.
    Index(usize),
    /// Entry of a map.
    Key(String),
}

impl PathStep {
    /// Shape marker for the level this step descends into.
    #[must_use]
    pub const fn marker(&self) -> &'static str {
        match self {
            Self::Index(_) => "[]",
            Self::Key(_) => "{}",
        }
    }
}

///
/// FieldPath
///
/// Instance path of a leaf: the top-level field plus one step per level.
/// Displays as `Name`, `Tags[1]`, `Meta.city`, `Grid[0][2]`.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct FieldPath {
    field: String,
    steps: Vec<PathStep>,
}

impl FieldPath {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            steps: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_steps(field: impl Into<String>, steps: Vec<PathStep>) -> Self {
        Self {
            field: field.into(),
            steps,
        }
    }

    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    #[must_use]
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Nesting depth below the top-level field.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn child(&self, step: PathStep) -> Self {
        let mut steps = Vec::with_capacity(self.steps.len() + 1);
        steps.extend(self.steps.iter().cloned());
        steps.push(step);

        Self {
            field: self.field.clone(),
            steps,
        }
    }

    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        self.child(PathStep::Index(index))
    }

    #[must_use]
    pub fn key(&self, key: impl Into<String>) -> Self {
        self.child(PathStep::Key(key.into()))
    }

    /// Shape path used by the depth-kind map: `Tags[]`, `Meta{}`.
    #[must_use]
    pub fn shape(&self) -> String {
        let mut out = self.field.clone();
        for step in &self.steps {
            out.push_str(step.marker());
        }
        out
    }

    pub(crate) fn encode_steps_into(&self, out: &mut String) {
        for step in &self.steps {
            match step {
                PathStep::Index(i) => {
                    out.push('[');
                    out.push_str(&i.to_string());
                }
                PathStep::Key(k) => {
                    out.push('{');
                    escape_into(k, out);
                }
            }
            out.push(STEP);
        }
    }

    /// Decode the `{field}\x01{steps}` component of a key.
    pub(crate) fn decode(s: &str) -> Result<Self, KeyDecodeError> {
        let mut pieces = s.split(STEP);
        let field = pieces.next().unwrap_or_default();

        // every piece, the field included, is terminated by STEP,
        // so the final split piece must be empty
        let mut rest: Vec<&str> = pieces.collect();
        match rest.pop() {
            Some("") => {}
            _ => return Err(KeyDecodeError::UnterminatedPath),
        }

        let mut steps = Vec::with_capacity(rest.len());
        for piece in rest {
            let step = if let Some(index) = piece.strip_prefix('[') {
                let index = index
                    .parse::<usize>()
                    .map_err(|_| KeyDecodeError::Step(piece.to_string()))?;
                PathStep::Index(index)
            } else if let Some(key) = piece.strip_prefix('{') {
                PathStep::Key(unescape(key)?)
            } else {
                return Err(KeyDecodeError::Step(piece.to_string()));
            };
            steps.push(step);
        }

        Ok(Self {
            field: field.to_string(),
            steps,
        })
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.field)?;
        for step in &self.steps {
            match step {
                PathStep::Index(i) => write!(f, "[{i}]")?,
                PathStep::Key(k) => write!(f, ".{k}")?,
            }
        }
        Ok(())
    }
}
