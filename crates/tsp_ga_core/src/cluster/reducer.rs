use crate::Tour;

/// Shorter of two tours; ties keep `a`.
pub fn reduce<'a>(a: &'a Tour, b: &'a Tour) -> &'a Tour {
    if a.length() <= b.length() { a } else { b }
}

/// Collects one best tour per node and keeps the global minimum.
#[derive(Debug, Default)]
pub struct GlobalReducer {
    best: Option<Tour>,
    candidates: usize,
}

impl GlobalReducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offer(&mut self, candidate: Tour) {
        self.candidates += 1;
        self.best = match self.best.take() {
            Some(current) if current.length() <= candidate.length() => Some(current),
            _ => Some(candidate),
        };
    }

    pub fn best(&self) -> Option<&Tour> {
        self.best.as_ref()
    }

    pub fn candidates(&self) -> usize {
        self.candidates
    }

    pub fn finish(self) -> Option<Tour> {
        self.best
    }
}
