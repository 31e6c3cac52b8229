use std::{collections::BTreeMap, fmt};

///
/// ErrorTree
///
/// Validation issues grouped by route (resource id, then nested node keys).
/// Collecting never stops at the first issue; callers decide via `result`.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ErrorTree {
    messages: Vec<String>,
    children: BTreeMap<String, Self>,
}

impl ErrorTree {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
            children: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, err: impl ToString) {
        self.messages.push(err.to_string());
    }

    /// Merge `tree` under the given route, creating intermediate nodes.
    pub fn add_at<S: AsRef<str>>(&mut self, route: &[S], tree: Self) {
        if tree.is_empty() {
            return;
        }

        let mut node = self;
        for key in route {
            node = node.children.entry(key.as_ref().to_string()).or_default();
        }
        node.merge(tree);
    }

    pub fn merge(&mut self, other: Self) {
        self.messages.extend(other.messages);
        for (key, child) in other.children {
            self.children.entry(key).or_default().merge(child);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.children.values().all(Self::is_empty)
    }

    /// Total number of messages in this tree and all children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len() + self.children.values().map(Self::len).sum::<usize>()
    }

    /// Flatten into `(route, message)` pairs; the route is dot-joined.
    #[must_use]
    pub fn flatten(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        self.flatten_into(&mut Vec::new(), &mut out);

        out
    }

    fn flatten_into<'a>(&'a self, route: &mut Vec<&'a str>, out: &mut Vec<(String, String)>) {
        for message in &self.messages {
            out.push((route.join("."), message.clone()));
        }
        for (key, child) in &self.children {
            route.push(key);
            child.flatten_into(route, out);
            route.pop();
        }
    }

    pub fn result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ErrorTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines = self.flatten();
        for (i, (route, message)) in lines.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            if route.is_empty() {
                write!(f, "{message}")?;
            } else {
                write!(f, "{route}: {message}")?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for ErrorTree {}

///
/// err
/// Append a formatted message to an `ErrorTree`.
///

#[macro_export]
macro_rules! err {
    ($errs:expr, $($arg:tt)*) => {
        $errs.add(format!($($arg)*))
    };
}
