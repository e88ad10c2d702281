//! Scope tree and name resolution.
//!
//! Scopes form a flat vector with parent indices; each scope is a tagged
//! variant rather than a virtual class, so resolution dispatches by tag and
//! the chain walk is an index loop. The global scope holds the external
//! library references and memoizes successful reflective lookups so that a
//! name resolved during evaluation yields the same descriptor when the
//! backend asks again.

use std::collections::HashMap;

use la_arena::Arena;
use smol_str::SmolStr;

use crate::ast::{FuncId, Function, VarId, Variable};
use crate::reflect::{ExternalField, ExternalMethod, TypeProvider};
use crate::types::{Signature, Type};

pub type ScopeId = usize;

/// Key of a memoized external method lookup: qualified name plus actual
/// argument types (arrays keyed by rank, like type equality).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SigKey {
    pub name: SmolStr,
    pub args: Vec<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScopeKind {
    Global {
        libraries: Vec<String>,
        field_cache: HashMap<SmolStr, ExternalField>,
        method_cache: HashMap<SigKey, ExternalMethod>,
    },
    Program {
        functions: Vec<FuncId>,
        globals: Vec<VarId>,
    },
    Local {
        ret: Type,
        params: Vec<VarId>,
        locals: Vec<VarId>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VarLookup {
    Var(VarId),
    External(ExternalField),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallLookup {
    Function(FuncId),
    External(ExternalMethod),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    NotFound,
    Ambiguous,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl ScopeTree {
    pub fn new() -> ScopeTree {
        ScopeTree::default()
    }

    pub fn push_global(&mut self, libraries: Vec<String>) -> ScopeId {
        self.scopes.push(Scope {
            parent: None,
            kind: ScopeKind::Global {
                libraries,
                field_cache: HashMap::new(),
                method_cache: HashMap::new(),
            },
        });
        self.scopes.len() - 1
    }

    pub fn push_program(&mut self, parent: ScopeId) -> ScopeId {
        self.scopes.push(Scope {
            parent: Some(parent),
            kind: ScopeKind::Program {
                functions: Vec::new(),
                globals: Vec::new(),
            },
        });
        self.scopes.len() - 1
    }

    pub fn push_local(&mut self, parent: ScopeId) -> ScopeId {
        self.scopes.push(Scope {
            parent: Some(parent),
            kind: ScopeKind::Local {
                ret: Type::VOID,
                params: Vec::new(),
                locals: Vec::new(),
            },
        });
        self.scopes.len() - 1
    }

    pub fn parent_of(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope].parent
    }

    pub fn set_return_type(&mut self, scope: ScopeId, ty: Type) {
        if let ScopeKind::Local { ret, .. } = &mut self.scopes[scope].kind {
            *ret = ty;
        }
    }

    /// Declared return type of the function owning `scope`, walking upward.
    pub fn return_type_of(&self, mut scope: ScopeId) -> Type {
        loop {
            match &self.scopes[scope].kind {
                ScopeKind::Local { ret, .. } => return ret.clone(),
                _ => match self.scopes[scope].parent {
                    Some(p) => scope = p,
                    None => return Type::VOID,
                },
            }
        }
    }

    pub fn add_function(&mut self, scope: ScopeId, func: FuncId) {
        if let ScopeKind::Program { functions, .. } = &mut self.scopes[scope].kind {
            functions.push(func);
        }
    }

    pub fn add_global(&mut self, scope: ScopeId, var: VarId) {
        if let ScopeKind::Program { globals, .. } = &mut self.scopes[scope].kind {
            globals.push(var);
        }
    }

    pub fn add_param(&mut self, scope: ScopeId, var: VarId) {
        if let ScopeKind::Local { params, .. } = &mut self.scopes[scope].kind {
            params.push(var);
        }
    }

    pub fn add_local(&mut self, scope: ScopeId, var: VarId) {
        if let ScopeKind::Local { locals, .. } = &mut self.scopes[scope].kind {
            locals.push(var);
        }
    }

    pub fn globals_of(&self, scope: ScopeId) -> &[VarId] {
        match &self.scopes[scope].kind {
            ScopeKind::Program { globals, .. } => globals,
            _ => &[],
        }
    }

    pub fn locals_of(&self, scope: ScopeId) -> &[VarId] {
        match &self.scopes[scope].kind {
            ScopeKind::Local { locals, .. } => locals,
            _ => &[],
        }
    }

    /// Whether `name` is declared directly in `scope` (not in any parent).
    pub fn declares(&self, scope: ScopeId, name: &str, vars: &Arena<Variable>) -> bool {
        let ids: &[VarId] = match &self.scopes[scope].kind {
            ScopeKind::Local { params, locals, .. } => {
                return params
                    .iter()
                    .chain(locals.iter())
                    .any(|&v| vars[v].name == name);
            }
            ScopeKind::Program { globals, .. } => globals,
            ScopeKind::Global { .. } => &[],
        };
        ids.iter().any(|&v| vars[v].name == name)
    }

    /// Resolve a variable reference, innermost scope first. Qualified names
    /// (`Type.Member`) resolve only in the global scope through the provider.
    pub fn resolve_var(
        &mut self,
        scope: ScopeId,
        name: &str,
        vars: &Arena<Variable>,
        provider: &dyn TypeProvider,
    ) -> Result<VarLookup, ResolveError> {
        let mut current = Some(scope);
        while let Some(id) = current {
            match &mut self.scopes[id].kind {
                ScopeKind::Local { params, locals, .. } => {
                    if let Some(&v) = params
                        .iter()
                        .chain(locals.iter())
                        .find(|&&v| vars[v].name == name)
                    {
                        return Ok(VarLookup::Var(v));
                    }
                }
                ScopeKind::Program { globals, .. } => {
                    if let Some(&v) = globals.iter().find(|&&v| vars[v].name == name) {
                        return Ok(VarLookup::Var(v));
                    }
                }
                ScopeKind::Global {
                    libraries,
                    field_cache,
                    ..
                } => {
                    if let Some(field) = field_cache.get(name) {
                        return Ok(VarLookup::External(field.clone()));
                    }
                    let (owner, member) = match name.rsplit_once('.') {
                        Some(split) => split,
                        None => break,
                    };
                    for lib in libraries.iter() {
                        let desc = match provider.find_type(lib, owner) {
                            Some(d) => d,
                            None => continue,
                        };
                        if let Some(f) = desc.fields.iter().find(|f| f.name == member) {
                            let field = ExternalField {
                                library: SmolStr::from(lib.as_str()),
                                owner: SmolStr::from(owner),
                                name: SmolStr::from(member),
                                ty: f.ty.clone(),
                            };
                            field_cache.insert(SmolStr::from(name), field.clone());
                            return Ok(VarLookup::External(field));
                        }
                    }
                }
            }
            current = self.scopes[id].parent;
        }
        Err(ResolveError::NotFound)
    }

    /// Resolve a call, innermost scope first. User functions live in the
    /// program scope; qualified names reach external static methods through
    /// the provider. Both paths share the overload algorithm.
    pub fn resolve_call(
        &mut self,
        scope: ScopeId,
        name: &str,
        args: &[Type],
        funcs: &Arena<Function>,
        vars: &Arena<Variable>,
        provider: &dyn TypeProvider,
    ) -> Result<CallLookup, ResolveError> {
        let mut current = Some(scope);
        while let Some(id) = current {
            match &mut self.scopes[id].kind {
                ScopeKind::Local { .. } => {}
                ScopeKind::Program { functions, .. } => {
                    let cands: Vec<FuncId> = functions
                        .iter()
                        .copied()
                        .filter(|&f| funcs[f].name == name)
                        .collect();
                    if !cands.is_empty() {
                        let sigs: Vec<Signature> = cands
                            .iter()
                            .map(|&f| Signature {
                                name: funcs[f].name.clone(),
                                ret: funcs[f].ret.clone(),
                                params: funcs[f]
                                    .params
                                    .iter()
                                    .map(|&p| vars[p].ty.clone())
                                    .collect(),
                            })
                            .collect();
                        let picked = pick_overload(&sigs, args)?;
                        return Ok(CallLookup::Function(cands[picked]));
                    }
                }
                ScopeKind::Global {
                    libraries,
                    method_cache,
                    ..
                } => {
                    let key = SigKey {
                        name: SmolStr::from(name),
                        args: args.to_vec(),
                    };
                    if let Some(m) = method_cache.get(&key) {
                        return Ok(CallLookup::External(m.clone()));
                    }
                    let (owner, member) = match name.rsplit_once('.') {
                        Some(split) => split,
                        None => break,
                    };
                    for lib in libraries.iter() {
                        let desc = match provider.find_type(lib, owner) {
                            Some(d) => d,
                            None => continue,
                        };
                        // overloads with a parameter type the compiler does
                        // not model are not candidates
                        let methods: Vec<_> = desc
                            .methods
                            .iter()
                            .filter(|m| m.name == member)
                            .filter(|m| !m.params.iter().any(Type::is_unsupported))
                            .collect();
                        if methods.is_empty() {
                            continue;
                        }
                        let sigs: Vec<Signature> = methods
                            .iter()
                            .map(|m| Signature {
                                name: m.name.clone(),
                                ret: m.ret.clone(),
                                params: m.params.clone(),
                            })
                            .collect();
                        let picked = pick_overload(&sigs, args)?;
                        let m = methods[picked];
                        let ext = ExternalMethod {
                            library: SmolStr::from(lib.as_str()),
                            owner: SmolStr::from(owner),
                            name: SmolStr::from(member),
                            params: m.params.clone(),
                            ret: m.ret.clone(),
                        };
                        method_cache.insert(key, ext.clone());
                        return Ok(CallLookup::External(ext));
                    }
                }
            }
            current = self.scopes[id].parent;
        }
        Err(ResolveError::NotFound)
    }
}

enum Preference {
    First,
    Second,
    Ambiguous,
}

/// Pointwise preference between two compatible candidates: an argument where
/// one signature matches exactly and the other does not votes for the exact
/// one; conflicting votes (or none) leave the pair ambiguous.
fn prefer(a: &Signature, b: &Signature, args: &[Type]) -> Preference {
    let mut votes_a = false;
    let mut votes_b = false;
    for (i, arg) in args.iter().enumerate() {
        let exact_a = &a.params[i] == arg;
        let exact_b = &b.params[i] == arg;
        if exact_a && !exact_b {
            votes_a = true;
        }
        if exact_b && !exact_a {
            votes_b = true;
        }
    }
    match (votes_a, votes_b) {
        (true, false) => Preference::First,
        (false, true) => Preference::Second,
        _ => Preference::Ambiguous,
    }
}

/// The overload algorithm: keep the compatible candidates, pick an exact
/// match outright, otherwise reduce a working set under pointwise dominance.
pub fn pick_overload(sigs: &[Signature], args: &[Type]) -> Result<usize, ResolveError> {
    let compatible: Vec<usize> = sigs
        .iter()
        .enumerate()
        .filter(|(_, s)| s.accepts(args))
        .map(|(i, _)| i)
        .collect();
    if compatible.is_empty() {
        return Err(ResolveError::NotFound);
    }
    if let Some(&exact) = compatible.iter().find(|&&i| sigs[i].matches_exact(args)) {
        return Ok(exact);
    }

    let mut best: Vec<usize> = Vec::new();
    'candidates: for &c in &compatible {
        let mut i = 0;
        while i < best.len() {
            match prefer(&sigs[best[i]], &sigs[c], args) {
                Preference::First => continue 'candidates,
                Preference::Second => {
                    best.remove(i);
                }
                Preference::Ambiguous => i += 1,
            }
        }
        best.push(c);
    }
    if best.len() == 1 {
        Ok(best[0])
    } else {
        Err(ResolveError::Ambiguous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(params: &[Type]) -> Signature {
        Signature {
            name: SmolStr::from("f"),
            ret: Type::VOID,
            params: params.to_vec(),
        }
    }

    #[test]
    fn exact_match_wins_immediately() {
        let sigs = vec![sig(&[Type::DOUBLE]), sig(&[Type::INT])];
        assert_eq!(pick_overload(&sigs, &[Type::INT]), Ok(1));
    }

    #[test]
    fn widening_candidate_used_when_unique() {
        let sigs = vec![sig(&[Type::DOUBLE])];
        assert_eq!(pick_overload(&sigs, &[Type::INT]), Ok(0));
    }

    #[test]
    fn conflicting_votes_are_ambiguous() {
        let sigs = vec![
            sig(&[Type::INT, Type::DOUBLE]),
            sig(&[Type::DOUBLE, Type::INT]),
        ];
        assert_eq!(
            pick_overload(&sigs, &[Type::INT, Type::INT]),
            Err(ResolveError::Ambiguous)
        );
    }

    #[test]
    fn dominating_candidate_prunes_the_set() {
        let sigs = vec![
            sig(&[Type::DOUBLE, Type::DOUBLE]),
            sig(&[Type::INT, Type::DOUBLE]),
        ];
        assert_eq!(pick_overload(&sigs, &[Type::INT, Type::INT]), Ok(1));
    }

    #[test]
    fn no_compatible_candidate() {
        let sigs = vec![sig(&[Type::STRING])];
        assert_eq!(
            pick_overload(&sigs, &[Type::INT]),
            Err(ResolveError::NotFound)
        );
    }
}
