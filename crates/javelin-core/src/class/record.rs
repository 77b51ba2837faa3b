//! Class records and the builder used to describe them

use crate::runtime::Runtime;
use crate::value::Value;
use crate::RuntimeResult;
use javelin_types::{ClassId, ClassKind, FieldDescriptor, FieldFlags, FieldTable, TypeTag};
use parking_lot::{Condvar, Mutex, RwLock};
use rustc_hash::FxHashSet;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// A static initializer block
///
/// Blocks run with the runtime that triggered initialization, so they can read and write
/// static fields of other classes (which initializes those classes first) and allocate
/// objects. Returning an error fails the class permanently.
pub trait StaticInitializer: Send + Sync {
    /// Run the block for `class`
    fn run(&self, runtime: &Runtime, class: &ClassId) -> RuntimeResult<()>;
}

impl<F> StaticInitializer for F
where
    F: Fn(&Runtime, &ClassId) -> RuntimeResult<()> + Send + Sync,
{
    fn run(&self, runtime: &Runtime, class: &ClassId) -> RuntimeResult<()> {
        self(runtime, class)
    }
}

/// Static initialization state of a class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InitState {
    /// Not yet triggered
    Uninitialized,
    /// Static initializers are running
    Initializing,
    /// Static initializers completed
    Initialized,
    /// Static initialization failed (terminal)
    Failed,
}

impl fmt::Display for InitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitState::Uninitialized => write!(f, "uninitialized"),
            InitState::Initializing => write!(f, "initializing"),
            InitState::Initialized => write!(f, "initialized"),
            InitState::Failed => write!(f, "failed"),
        }
    }
}

/// One step of a class's static initialization, in declaration order
#[derive(Clone)]
pub(crate) enum StaticStep {
    /// Store a constant into a static slot
    Constant { slot: usize, value: Value },
    /// Run a static block
    Block(Arc<dyn StaticInitializer>),
}

impl fmt::Debug for StaticStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaticStep::Constant { slot, value } => write!(f, "Constant({} <- {:?})", slot, value),
            StaticStep::Block(_) => write!(f, "Block"),
        }
    }
}

/// Outcome of trying to claim initialization of a class
#[derive(Debug)]
pub(crate) enum InitClaim {
    /// Already initialized
    Done,
    /// Failed earlier with the recorded cause
    Failed(Arc<str>),
    /// Being initialized further up the current thread's call chain
    Reentrant,
    /// The caller now owns initialization and must call [`ClassRecord::finish_init`]
    Claimed,
}

#[derive(Debug)]
struct InitSlot {
    state: InitState,
    owner: Option<ThreadId>,
    failure: Option<Arc<str>>,
}

/// Registered metadata and static storage of one class
pub struct ClassRecord {
    id: ClassId,
    kind: ClassKind,
    superclass: Option<ClassId>,
    interfaces: Vec<ClassId>,
    fields: FieldTable,
    layout: Arc<[FieldDescriptor]>,
    supertypes: FxHashSet<ClassId>,
    component: Option<TypeTag>,
    steps: Vec<StaticStep>,
    instance_initializers: Vec<(usize, Value)>,
    statics: RwLock<Vec<Value>>,
    init: Mutex<InitSlot>,
    init_done: Condvar,
}

impl ClassRecord {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: ClassId,
        kind: ClassKind,
        superclass: Option<ClassId>,
        interfaces: Vec<ClassId>,
        fields: FieldTable,
        layout: Arc<[FieldDescriptor]>,
        supertypes: FxHashSet<ClassId>,
        steps: Vec<StaticStep>,
        instance_initializers: Vec<(usize, Value)>,
    ) -> Self {
        let statics = fields
            .static_fields()
            .map(|field| Value::default_for(&field.type_tag))
            .collect();
        Self {
            id,
            kind,
            superclass,
            interfaces,
            fields,
            layout,
            supertypes,
            component: None,
            steps,
            instance_initializers,
            statics: RwLock::new(statics),
            init: Mutex::new(InitSlot {
                state: InitState::Uninitialized,
                owner: None,
                failure: None,
            }),
            init_done: Condvar::new(),
        }
    }

    /// Record for a primitive or array class
    ///
    /// Built-in classes have no fields and no initializers, so they start initialized.
    pub(crate) fn builtin(id: ClassId, kind: ClassKind, component: Option<TypeTag>) -> Self {
        let mut supertypes = FxHashSet::default();
        supertypes.insert(id.clone());
        let mut record = Self::new(
            id,
            kind,
            None,
            Vec::new(),
            FieldTable::new(),
            Arc::from(Vec::new()),
            supertypes,
            Vec::new(),
            Vec::new(),
        );
        record.component = component;
        record.init.get_mut().state = InitState::Initialized;
        record
    }

    /// Class id
    pub fn id(&self) -> &ClassId {
        &self.id
    }

    /// Class kind
    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    /// Direct superclass
    pub fn superclass(&self) -> Option<&ClassId> {
        self.superclass.as_ref()
    }

    /// Directly implemented (or extended, for interfaces) interfaces
    pub fn interfaces(&self) -> &[ClassId] {
        &self.interfaces
    }

    /// Fields declared by this class, in declaration order
    pub fn declared_fields(&self) -> &FieldTable {
        &self.fields
    }

    /// Full instance layout: inherited fields first, then own instance fields
    pub fn layout(&self) -> &Arc<[FieldDescriptor]> {
        &self.layout
    }

    /// Number of instance slots
    pub fn instance_size(&self) -> usize {
        self.layout.len()
    }

    /// Component type of an array class
    pub fn component_type(&self) -> Option<&TypeTag> {
        self.component.as_ref()
    }

    /// Check for an interface
    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    /// Whether `allocate` may create instances of this class
    pub fn is_instantiable(&self) -> bool {
        self.kind == ClassKind::Class
    }

    /// Check if `other` is this class, one of its superclasses or one of its interfaces
    pub fn has_supertype(&self, other: &ClassId) -> bool {
        self.supertypes.contains(other)
    }

    pub(crate) fn supertypes(&self) -> &FxHashSet<ClassId> {
        &self.supertypes
    }

    pub(crate) fn steps(&self) -> &[StaticStep] {
        &self.steps
    }

    /// Own instance field initializers as (slot, value)
    pub(crate) fn instance_initializers(&self) -> &[(usize, Value)] {
        &self.instance_initializers
    }

    /// Read a static slot
    pub fn read_static(&self, slot: usize) -> Option<Value> {
        self.statics.read().get(slot).copied()
    }

    /// Write a static slot, returning false if the slot does not exist
    pub fn write_static(&self, slot: usize, value: Value) -> bool {
        match self.statics.write().get_mut(slot) {
            Some(target) => {
                *target = value;
                true
            }
            None => false,
        }
    }

    /// Current initialization state
    pub fn init_state(&self) -> InitState {
        self.init.lock().state
    }

    /// Cause recorded when initialization failed
    pub fn init_failure(&self) -> Option<Arc<str>> {
        self.init.lock().failure.clone()
    }

    /// Claim initialization, waiting while another thread holds it
    pub(crate) fn claim_init(&self) -> InitClaim {
        let me = thread::current().id();
        let mut slot = self.init.lock();
        loop {
            match slot.state {
                InitState::Initialized => return InitClaim::Done,
                InitState::Failed => {
                    let cause = slot
                        .failure
                        .clone()
                        .unwrap_or_else(|| Arc::from("unknown cause"));
                    return InitClaim::Failed(cause);
                }
                InitState::Initializing if slot.owner == Some(me) => return InitClaim::Reentrant,
                InitState::Initializing => self.init_done.wait(&mut slot),
                InitState::Uninitialized => {
                    slot.state = InitState::Initializing;
                    slot.owner = Some(me);
                    return InitClaim::Claimed;
                }
            }
        }
    }

    /// Publish the outcome of a claimed initialization and wake waiters
    pub(crate) fn finish_init(&self, outcome: Result<(), Arc<str>>) {
        let mut slot = self.init.lock();
        slot.owner = None;
        match outcome {
            Ok(()) => slot.state = InitState::Initialized,
            Err(cause) => {
                slot.state = InitState::Failed;
                slot.failure = Some(cause);
            }
        }
        drop(slot);
        self.init_done.notify_all();
    }
}

impl fmt::Debug for ClassRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassRecord")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("superclass", &self.superclass)
            .field("interfaces", &self.interfaces)
            .field("fields", &self.fields.len())
            .field("instance_size", &self.layout.len())
            .field("state", &self.init_state())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PendingField {
    pub name: Arc<str>,
    pub type_tag: TypeTag,
    pub flags: FieldFlags,
}

#[derive(Clone)]
pub(crate) enum PendingStep {
    Constant { field: Arc<str>, value: Value },
    Block(Arc<dyn StaticInitializer>),
}

/// Describes a class before registration
///
/// ```
/// use javelin_core::{ClassBuilder, FieldFlags, TypeTag, Value};
///
/// let builder = ClassBuilder::new("pkg/Counter")
///     .static_field_with("count", TypeTag::Int, FieldFlags::PUBLIC, Value::Int(0))
///     .field("value", TypeTag::Long, FieldFlags::PRIVATE);
/// ```
#[derive(Clone)]
pub struct ClassBuilder {
    pub(crate) id: ClassId,
    pub(crate) kind: ClassKind,
    pub(crate) superclass: Option<ClassId>,
    pub(crate) interfaces: Vec<ClassId>,
    pub(crate) fields: Vec<PendingField>,
    pub(crate) steps: Vec<PendingStep>,
    pub(crate) instance_initializers: Vec<(Arc<str>, Value)>,
}

impl ClassBuilder {
    /// Start describing an ordinary class
    pub fn new(id: impl Into<ClassId>) -> Self {
        Self {
            id: id.into(),
            kind: ClassKind::Class,
            superclass: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            steps: Vec::new(),
            instance_initializers: Vec::new(),
        }
    }

    /// Start describing an interface
    pub fn interface(id: impl Into<ClassId>) -> Self {
        Self {
            kind: ClassKind::Interface,
            ..Self::new(id)
        }
    }

    /// Class id being described
    pub fn id(&self) -> &ClassId {
        &self.id
    }

    /// Set the superclass
    pub fn superclass(mut self, superclass: impl Into<ClassId>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    /// Add an implemented interface
    pub fn implements(mut self, interface: impl Into<ClassId>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Declare a field (static if `flags` contains [`FieldFlags::STATIC`])
    pub fn field(mut self, name: &str, type_tag: TypeTag, flags: FieldFlags) -> Self {
        self.fields.push(PendingField {
            name: Arc::from(name),
            type_tag,
            flags,
        });
        self
    }

    /// Declare an instance field assigned `value` on construction
    pub fn field_with(self, name: &str, type_tag: TypeTag, flags: FieldFlags, value: Value) -> Self {
        let mut builder = self.field(name, type_tag, flags);
        builder.instance_initializers.push((Arc::from(name), value));
        builder
    }

    /// Declare a static field
    pub fn static_field(self, name: &str, type_tag: TypeTag, flags: FieldFlags) -> Self {
        self.field(name, type_tag, flags | FieldFlags::STATIC)
    }

    /// Declare a static field with a constant initializer
    ///
    /// The store runs as a static initialization step at this point of the declaration
    /// order, interleaved with [`static_block`](Self::static_block)s.
    pub fn static_field_with(
        self,
        name: &str,
        type_tag: TypeTag,
        flags: FieldFlags,
        value: Value,
    ) -> Self {
        let mut builder = self.static_field(name, type_tag, flags);
        builder.steps.push(PendingStep::Constant {
            field: Arc::from(name),
            value,
        });
        builder
    }

    /// Append a static initializer block
    pub fn static_block<F>(self, block: F) -> Self
    where
        F: Fn(&Runtime, &ClassId) -> RuntimeResult<()> + Send + Sync + 'static,
    {
        self.static_initializer(block)
    }

    /// Append a static initializer implemented by a named type
    pub fn static_initializer(mut self, initializer: impl StaticInitializer + 'static) -> Self {
        self.steps.push(PendingStep::Block(Arc::new(initializer)));
        self
    }
}

impl fmt::Debug for ClassBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassBuilder")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("superclass", &self.superclass)
            .field("interfaces", &self.interfaces)
            .field("fields", &self.fields)
            .field("steps", &self.steps.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_record() -> ClassRecord {
        let mut fields = FieldTable::new();
        fields.push(FieldDescriptor::new(
            "count",
            TypeTag::Int,
            ClassId::new("pkg/A"),
            0,
            FieldFlags::STATIC,
        ));
        let mut supertypes = FxHashSet::default();
        supertypes.insert(ClassId::new("pkg/A"));
        ClassRecord::new(
            ClassId::new("pkg/A"),
            ClassKind::Class,
            None,
            Vec::new(),
            fields,
            Arc::from(Vec::new()),
            supertypes,
            Vec::new(),
            Vec::new(),
        )
    }

    #[test]
    fn test_statics_start_at_default() {
        let record = leaf_record();
        assert_eq!(record.read_static(0), Some(Value::Int(0)));
        assert_eq!(record.read_static(1), None);
        assert!(record.write_static(0, Value::Int(9)));
        assert!(!record.write_static(3, Value::Int(9)));
        assert_eq!(record.read_static(0), Some(Value::Int(9)));
    }

    #[test]
    fn test_claim_and_finish() {
        let record = leaf_record();
        assert_eq!(record.init_state(), InitState::Uninitialized);
        assert!(matches!(record.claim_init(), InitClaim::Claimed));
        assert_eq!(record.init_state(), InitState::Initializing);
        assert!(matches!(record.claim_init(), InitClaim::Reentrant));
        record.finish_init(Ok(()));
        assert!(matches!(record.claim_init(), InitClaim::Done));
    }

    #[test]
    fn test_failure_is_sticky() {
        let record = leaf_record();
        assert!(matches!(record.claim_init(), InitClaim::Claimed));
        record.finish_init(Err(Arc::from("boom")));
        assert_eq!(record.init_state(), InitState::Failed);
        match record.claim_init() {
            InitClaim::Failed(cause) => assert_eq!(&*cause, "boom"),
            other => panic!("unexpected claim: {:?}", other),
        }
    }

    #[test]
    fn test_builtin_starts_initialized() {
        let record = ClassRecord::builtin(ClassId::new("int"), ClassKind::Primitive, None);
        assert_eq!(record.init_state(), InitState::Initialized);
        assert!(!record.is_instantiable());
        assert!(record.has_supertype(&ClassId::new("int")));
    }

    #[test]
    fn test_builder_collects_steps_in_order() {
        let builder = ClassBuilder::new("pkg/A")
            .static_field_with("a", TypeTag::Int, FieldFlags::NONE, Value::Int(1))
            .static_block(|_, _| Ok(()))
            .static_field_with("b", TypeTag::Int, FieldFlags::NONE, Value::Int(2));
        assert_eq!(builder.steps.len(), 3);
        assert!(matches!(builder.steps[1], PendingStep::Block(_)));
        assert!(builder.fields.iter().all(|f| f.flags.is_static()));
    }
}
