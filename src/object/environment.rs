use crate::object::Object;
use std::collections::HashMap;

/// How many scopes may be live before the first collection is attempted.
const INITIAL_COLLECTION_THRESHOLD: usize = 64;

/// ScopeId names one scope inside an `Environment`. Function values hold one to
/// refer to the scope they were defined in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

#[derive(Debug, Default)]
struct Scope {
    store: HashMap<String, Object>,
    outer: Option<ScopeId>,
}

/// Environment owns every scope created during evaluation: the global scope and
/// one per function call. Scopes only point outward, and closures refer to
/// scopes by id, so no ownership cycles form. Call scopes that are no longer
/// reachable are reclaimed by `collect`; everything is released when the
/// environment itself is dropped.
#[derive(Debug)]
pub struct Environment {
    scopes: Vec<Option<Scope>>,
    free: Vec<usize>,
    live: usize,
    next_collection: usize,

    // Roots beyond the global scope: scopes of calls in progress, and values an
    // unfinished expression still needs (a callee and its evaluated arguments).
    active: Vec<ScopeId>,
    pinned: Vec<Object>,
}

impl Default for Environment {
    fn default() -> Self {
        Environment {
            scopes: vec![Some(Scope::default())],
            free: vec![],
            live: 1,
            next_collection: INITIAL_COLLECTION_THRESHOLD,
            active: vec![],
            pinned: vec![],
        }
    }
}

impl Environment {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn global(&self) -> ScopeId {
        ScopeId(0)
    }

    /// new_enclosed returns a fresh scope whose lookups fall back to `outer`.
    pub fn new_enclosed(&mut self, outer: ScopeId) -> ScopeId {
        let scope = Scope {
            store: HashMap::new(),
            outer: Some(outer),
        };

        self.live += 1;

        match self.free.pop() {
            Some(index) => {
                self.scopes[index] = Some(scope);
                ScopeId(index)
            }
            None => {
                self.scopes.push(Some(scope));
                ScopeId(self.scopes.len() - 1)
            }
        }
    }

    /// Binds `key` in `scope` only, replacing any previous binding there.
    pub fn set(&mut self, scope: ScopeId, key: &str, value: Object) {
        if let Some(Some(scope)) = self.scopes.get_mut(scope.0) {
            scope.store.insert(key.to_string(), value);
        }
    }

    pub fn get(&self, scope: ScopeId, key: &str) -> Option<Object> {
        let mut current = Some(scope);

        while let Some(id) = current {
            let scope = self.scopes.get(id.0)?.as_ref()?;
            if let Some(value) = scope.store.get(key) {
                return Some(value.clone());
            }
            current = scope.outer;
        }

        None
    }

    /// Number of scopes currently allocated, the global scope included.
    pub fn live_scopes(&self) -> usize {
        self.live
    }

    pub(crate) fn enter(&mut self, scope: ScopeId) {
        self.active.push(scope);
    }

    pub(crate) fn leave(&mut self) {
        self.active.pop();
    }

    pub(crate) fn pin(&mut self, value: &Object) {
        if let Object::Function(_) = value {
            self.pinned.push(value.clone());
        }
    }

    pub(crate) fn pin_mark(&self) -> usize {
        self.pinned.len()
    }

    pub(crate) fn unpin(&mut self, mark: usize) {
        self.pinned.truncate(mark);
    }

    /// Collects once enough scopes have been allocated since the last run.
    /// `result` is kept alive alongside the usual roots.
    pub(crate) fn maybe_collect(&mut self, result: &Object) {
        if self.live >= self.next_collection {
            self.collect_with(Some(result));
            self.next_collection = (self.live * 2).max(INITIAL_COLLECTION_THRESHOLD);
        }
    }

    /// Frees every scope that can no longer be reached from the global scope,
    /// from a call in progress, or from a value still in use.
    pub fn collect(&mut self) {
        self.collect_with(None);
    }

    fn collect_with(&mut self, result: Option<&Object>) {
        let mut marked = vec![false; self.scopes.len()];
        let mut pending = vec![self.global()];

        pending.extend(self.active.iter().copied());
        for value in self.pinned.iter().chain(result) {
            push_captured(value, &mut pending);
        }

        while let Some(id) = pending.pop() {
            if marked[id.0] {
                continue;
            }
            marked[id.0] = true;

            if let Some(scope) = &self.scopes[id.0] {
                pending.extend(scope.outer);
                for value in scope.store.values() {
                    push_captured(value, &mut pending);
                }
            }
        }

        for (index, slot) in self.scopes.iter_mut().enumerate() {
            if !marked[index] && slot.take().is_some() {
                self.free.push(index);
                self.live -= 1;
            }
        }

        tracing::debug!(live = self.live, "collected scopes");
    }
}

fn push_captured(value: &Object, pending: &mut Vec<ScopeId>) {
    match value {
        Object::Function(function) => pending.push(function.env),
        Object::ReturnValue(value) => push_captured(value, pending),
        _ => {}
    }
}
