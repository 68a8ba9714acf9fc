//! The per-type cache of encoder routines and struct field plans.
//!
//! Reads never lock: the cache is an immutable [`Snapshot`] behind an
//! [`ArcSwap`]. Building new entries is serialized by a mutex, and the result
//! is published as a fresh copy of the whole snapshot.

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, LazyLock, Mutex, OnceLock, PoisonError, Weak};

use arc_swap::ArcSwap;
use hashbrown::HashMap;

use crate::encode;
use crate::error::{Error, Result};
use crate::shape::{Field, StructShape, TypeRef};
use crate::tags::FieldInfo;
use crate::writer::Writer;

pub(crate) type RoutineFn = dyn Fn(&Registry, &mut Writer, &dyn Any, &str) -> Result<()> + Send + Sync;

/// Writes one value of a specific type as an element with the given name.
pub(crate) type Routine = Arc<RoutineFn>;

#[inline]
pub(crate) fn routine(
    f: impl Fn(&Registry, &mut Writer, &dyn Any, &str) -> Result<()> + Send + Sync + 'static,
) -> Routine {
    Arc::new(f)
}

#[derive(Default)]
struct Snapshot {
    routines: HashMap<TypeId, Routine>,
    plans: HashMap<TypeId, Arc<StructPlan>>,
}

/// Cache of marshaling metadata, keyed by type.
///
/// Entries are built on first use and kept for the lifetime of the registry.
/// [`Registry::global`] is used by the free functions of this crate; a
/// separate registry behaves identically but shares nothing with it.
pub struct Registry {
    snapshot: ArcSwap<Snapshot>,
    write_lock: Mutex<()>,
}

static GLOBAL: LazyLock<Registry> = LazyLock::new(Registry::new);

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(Snapshot::default()),
            write_lock: Mutex::new(()),
        }
    }

    #[inline]
    #[must_use]
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// Number of types with a cached encoder.
    #[must_use]
    pub fn encoder_count(&self) -> usize {
        self.snapshot.load().routines.len()
    }

    pub(crate) fn routine(&self, ty: TypeRef) -> Routine {
        if let Some(routine) = self.snapshot.load().routines.get(&ty.id()) {
            return Arc::clone(routine);
        }

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let base = self.snapshot.load_full();
        if let Some(routine) = base.routines.get(&ty.id()) {
            return Arc::clone(routine);
        }

        let mut session = Session::new(&base);
        let routine = session.routine(ty);
        self.publish(&base, session.routines, session.plans);
        routine
    }

    pub(crate) fn plan(&self, ty: TypeRef, shape: &StructShape) -> Arc<StructPlan> {
        if let Some(plan) = self.snapshot.load().plans.get(&ty.id()) {
            return Arc::clone(plan);
        }

        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let base = self.snapshot.load_full();
        if let Some(plan) = base.plans.get(&ty.id()) {
            return Arc::clone(plan);
        }

        let plan = Arc::new(StructPlan::new(shape));
        let plans = HashMap::from_iter([(ty.id(), Arc::clone(&plan))]);
        self.publish(&base, HashMap::new(), plans);
        plan
    }

    fn publish(
        &self,
        base: &Snapshot,
        routines: HashMap<TypeId, Routine>,
        plans: HashMap<TypeId, Arc<StructPlan>>,
    ) {
        if routines.is_empty() && plans.is_empty() {
            return;
        }
        let mut next = Snapshot {
            routines: base.routines.clone(),
            plans: base.plans.clone(),
        };
        next.routines.extend(routines);
        next.plans.extend(plans);
        log::debug!(
            "publishing registry snapshot with {} encoders and {} field plans",
            next.routines.len(),
            next.plans.len()
        );
        self.snapshot.store(Arc::new(next));
    }
}

impl Default for Registry {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot.load();
        f.debug_struct("Registry")
            .field("encoders", &snapshot.routines.len())
            .field("plans", &snapshot.plans.len())
            .finish()
    }
}

/// State of one round of building, done while holding the write lock.
///
/// A type whose routine is being built gets a [`Forward`] first, so a
/// recursive reference to it resolves to the stub instead of recursing.
pub(crate) struct Session<'a> {
    base: &'a Snapshot,
    routines: HashMap<TypeId, Routine>,
    plans: HashMap<TypeId, Arc<StructPlan>>,
    pending: HashMap<TypeId, Arc<Forward>>,
}

impl<'a> Session<'a> {
    fn new(base: &'a Snapshot) -> Self {
        Self {
            base,
            routines: HashMap::new(),
            plans: HashMap::new(),
            pending: HashMap::new(),
        }
    }

    pub fn routine(&mut self, ty: TypeRef) -> Routine {
        let id = ty.id();
        if let Some(routine) = self.base.routines.get(&id).or_else(|| self.routines.get(&id)) {
            return Arc::clone(routine);
        }
        if let Some(forward) = self.pending.get(&id) {
            log::trace!("{} refers to itself, using a forwarding stub", ty.name());
            return forward.routine();
        }

        let forward = Arc::new(Forward::new(ty.name()));
        self.pending.insert(id, Arc::clone(&forward));
        let routine = encode::build(self, ty);
        forward.resolve(&routine);
        self.pending.remove(&id);
        self.routines.insert(id, Arc::clone(&routine));
        log::debug!("built encoder for {}", ty.name());
        routine
    }

    pub fn plan(&mut self, ty: TypeRef, shape: &StructShape) -> Arc<StructPlan> {
        let id = ty.id();
        if let Some(plan) = self.base.plans.get(&id).or_else(|| self.plans.get(&id)) {
            return Arc::clone(plan);
        }
        let plan = Arc::new(StructPlan::new(shape));
        self.plans.insert(id, Arc::clone(&plan));
        plan
    }
}

/// Placeholder for a routine that is still being built.
pub(crate) struct Forward {
    name: &'static str,
    target: OnceLock<Weak<RoutineFn>>,
}

impl Forward {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            target: OnceLock::new(),
        }
    }

    fn resolve(&self, routine: &Routine) {
        if self.target.set(Arc::downgrade(routine)).is_ok() {
            log::trace!("resolved forwarding stub for {}", self.name);
        }
    }

    fn routine(self: &Arc<Self>) -> Routine {
        let forward = Arc::clone(self);
        routine(move |registry, w, value, name| {
            let target = forward
                .target
                .get()
                .and_then(Weak::upgrade)
                .ok_or(Error::Unresolved(forward.name))?;
            target(registry, w, value, name)
        })
    }
}

/// Fields of a struct that take part in marshaling, with their parsed tags.
#[derive(Debug)]
pub(crate) struct StructPlan {
    pub name: &'static str,
    /// Fields not tagged `-`, in declaration order.
    pub fields: Vec<PlannedField>,
    /// Index into `fields` by the key the field's content has in a parsed
    /// element.
    pub by_key: HashMap<Cow<'static, str>, usize>,
}

#[derive(Debug)]
pub(crate) struct PlannedField {
    pub field: &'static Field,
    pub info: FieldInfo,
}

impl StructPlan {
    fn new(shape: &StructShape) -> Self {
        let mut fields = Vec::with_capacity(shape.fields.len());
        let mut by_key = HashMap::new();
        for field in shape.fields {
            let info = FieldInfo::parse(field.name, field.tag);
            if info.skip {
                continue;
            }
            by_key.entry(info.key()).or_insert(fields.len());
            fields.push(PlannedField { field, info });
        }
        log::trace!("planned {} of {} fields of {}", fields.len(), shape.fields.len(), shape.name);
        Self {
            name: shape.name,
            fields,
            by_key,
        }
    }
}
