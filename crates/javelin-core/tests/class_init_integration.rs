//! Integration tests for lazy static initialization

use javelin_core::{
    ClassBuilder, ClassId, FieldFlags, InitState, InitializationError, RegistryError, Runtime,
    RuntimeError, TypeTag, Value,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn reference(name: &str) -> TypeTag {
    TypeTag::Reference(ClassId::new(name))
}

/// ```java
/// class A { static B b; static C c; static int y;
///           static { c = new C(); y = B.x + c.b; } }
/// class B { static int x = 4; int z = 5; }
/// class C { static int a = 1; int b = 2; }
/// ```
fn register_multideps(runtime: &Runtime) {
    runtime
        .register(
            ClassBuilder::new("multideps$B")
                .static_field_with("x", TypeTag::Int, FieldFlags::NONE, Value::Int(4))
                .field_with("z", TypeTag::Int, FieldFlags::NONE, Value::Int(5)),
        )
        .unwrap();
    runtime
        .register(
            ClassBuilder::new("multideps$C")
                .static_field_with("a", TypeTag::Int, FieldFlags::NONE, Value::Int(1))
                .field_with("b", TypeTag::Int, FieldFlags::NONE, Value::Int(2)),
        )
        .unwrap();
    runtime
        .register(
            ClassBuilder::new("multideps$A")
                .static_field("b", reference("multideps$B"), FieldFlags::NONE)
                .static_field("c", reference("multideps$C"), FieldFlags::NONE)
                .static_field("y", TypeTag::Int, FieldFlags::NONE)
                .static_block(|rt, class| {
                    let c = rt.new_instance("multideps$C")?;
                    rt.put_static(class, "c", Value::Ref(c))?;
                    let x = rt.get_static("multideps$B", "x")?.as_i32().unwrap_or(0);
                    let cb = rt.read_field(c, "b")?.as_i32().unwrap_or(0);
                    rt.put_static(class, "y", Value::Int(x + cb))
                }),
        )
        .unwrap();
}

/// `A.b != null ? A.b.z : A.y`
fn multideps_test(runtime: &Runtime) -> Result<i32, RuntimeError> {
    match runtime.get_static("multideps$A", "b")? {
        Value::Ref(b) => Ok(runtime.read_field(b, "z")?.as_i32().unwrap_or(-1)),
        _ => Ok(runtime.get_static("multideps$A", "y")?.as_i32().unwrap_or(-1)),
    }
}

#[test]
fn test_multideps_result() {
    let runtime = Runtime::new();
    register_multideps(&runtime);

    assert_eq!(runtime.init_state("multideps$A").unwrap(), InitState::Uninitialized);
    assert_eq!(multideps_test(&runtime).unwrap(), 6);

    assert_eq!(runtime.init_state("multideps$A").unwrap(), InitState::Initialized);
    assert_eq!(runtime.init_state("multideps$B").unwrap(), InitState::Initialized);
    assert_eq!(runtime.init_state("multideps$C").unwrap(), InitState::Initialized);
    assert_eq!(runtime.get_static("multideps$C", "a").unwrap(), Value::Int(1));
    assert!(runtime.get_static("multideps$A", "c").unwrap().as_object().is_some());
}

/// ```java
/// class A { static B b; static int y = B.x; }
/// class B { static int x = 4; }
/// ```
#[test]
fn test_static_reads_dependency_constant() {
    let runtime = Runtime::new();
    runtime
        .register(ClassBuilder::new("deps$B").static_field_with(
            "x",
            TypeTag::Int,
            FieldFlags::NONE,
            Value::Int(4),
        ))
        .unwrap();
    runtime
        .register(
            ClassBuilder::new("deps$A")
                .static_field("b", reference("deps$B"), FieldFlags::NONE)
                .static_field("y", TypeTag::Int, FieldFlags::NONE)
                .static_block(|rt, class| {
                    let x = rt.get_static("deps$B", "x")?;
                    rt.put_static(class, "y", x)
                }),
        )
        .unwrap();

    assert_eq!(runtime.init_state("deps$B").unwrap(), InitState::Uninitialized);
    assert_eq!(runtime.get_static("deps$A", "b").unwrap(), Value::Null);
    assert_eq!(runtime.get_static("deps$A", "y").unwrap(), Value::Int(4));
    assert_eq!(runtime.init_state("deps$B").unwrap(), InitState::Initialized);
}

#[test]
fn test_mistyped_initializers_rejected_at_registration() {
    let runtime = Runtime::new();
    assert!(matches!(
        runtime.register(ClassBuilder::new("K").static_field_with(
            "x",
            TypeTag::Int,
            FieldFlags::NONE,
            Value::Long(5),
        )),
        Err(RuntimeError::Registry(RegistryError::IncompatibleInitializer { .. }))
    ));
    assert!(matches!(
        runtime.register(ClassBuilder::new("K").field_with(
            "y",
            TypeTag::Int,
            FieldFlags::NONE,
            Value::Double(1.0),
        )),
        Err(RuntimeError::Registry(RegistryError::IncompatibleInitializer { .. }))
    ));
    assert!(matches!(
        runtime.get_static("K", "x"),
        Err(RuntimeError::Registry(RegistryError::ClassNotFound(_)))
    ));
}

#[test]
fn test_allocate_does_not_initialize() {
    let runtime = Runtime::new();
    register_multideps(&runtime);
    runtime.allocate("multideps$C").unwrap();
    assert_eq!(runtime.init_state("multideps$C").unwrap(), InitState::Uninitialized);
}

#[test]
fn test_static_block_runs_once() {
    let runtime = Runtime::new();
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();
    runtime
        .register(
            ClassBuilder::new("Once")
                .static_field("n", TypeTag::Int, FieldFlags::PUBLIC)
                .static_block(move |rt, class| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    rt.put_static(class, "n", Value::Int(1))
                }),
        )
        .unwrap();

    for _ in 0..5 {
        assert_eq!(runtime.get_static("Once", "n").unwrap(), Value::Int(1));
    }
    runtime.new_instance("Once").unwrap();
    runtime.ensure_initialized("Once").unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn test_steps_run_in_declaration_order() {
    let runtime = Runtime::new();
    runtime
        .register(
            ClassBuilder::new("Ordered")
                .static_field_with("a", TypeTag::Int, FieldFlags::NONE, Value::Int(1))
                .static_field("seen", TypeTag::Int, FieldFlags::NONE)
                .static_block(|rt, class| {
                    let a = rt.get_static(class, "a")?;
                    let b = rt.get_static(class, "b")?;
                    let seen = a.as_i32().unwrap_or(0) * 10 + b.as_i32().unwrap_or(0);
                    rt.put_static(class, "seen", Value::Int(seen))
                })
                .static_field_with("b", TypeTag::Int, FieldFlags::NONE, Value::Int(2)),
        )
        .unwrap();

    // `b` is assigned after the block ran, so the block saw its default
    assert_eq!(runtime.get_static("Ordered", "seen").unwrap(), Value::Int(10));
    assert_eq!(runtime.get_static("Ordered", "b").unwrap(), Value::Int(2));
}

#[test]
fn test_superclass_initializes_first() {
    let runtime = Runtime::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    let log = order.clone();
    runtime
        .register(
            ClassBuilder::new("Base")
                .static_field("ready", TypeTag::Boolean, FieldFlags::PUBLIC)
                .static_block(move |rt, class| {
                    log.lock().push("Base");
                    rt.put_static(class, "ready", Value::Boolean(true))
                }),
        )
        .unwrap();

    let log = order.clone();
    runtime
        .register(
            ClassBuilder::new("Derived")
                .superclass("Base")
                .static_field("saw_ready", TypeTag::Boolean, FieldFlags::PUBLIC)
                .static_block(move |rt, class| {
                    log.lock().push("Derived");
                    let ready = rt.get_static("Base", "ready")?;
                    rt.put_static(class, "saw_ready", ready)
                }),
        )
        .unwrap();

    runtime.ensure_initialized("Derived").unwrap();
    assert_eq!(*order.lock(), vec!["Base", "Derived"]);
    assert_eq!(runtime.get_static("Derived", "saw_ready").unwrap(), Value::Boolean(true));
}

#[test]
fn test_inherited_static_initializes_declaring_class_only() {
    let runtime = Runtime::new();
    runtime
        .register(ClassBuilder::new("Parent").static_field_with(
            "shared",
            TypeTag::Int,
            FieldFlags::PUBLIC,
            Value::Int(11),
        ))
        .unwrap();
    runtime
        .register(ClassBuilder::new("Child").superclass("Parent"))
        .unwrap();

    assert_eq!(runtime.get_static("Child", "shared").unwrap(), Value::Int(11));
    assert_eq!(runtime.init_state("Parent").unwrap(), InitState::Initialized);
    assert_eq!(runtime.init_state("Child").unwrap(), InitState::Uninitialized);
}

#[test]
fn test_interface_constants_resolve() {
    let runtime = Runtime::new();
    runtime
        .register(ClassBuilder::interface("Limits").static_field_with(
            "MAX",
            TypeTag::Int,
            FieldFlags::PUBLIC | FieldFlags::FINAL,
            Value::Int(64),
        ))
        .unwrap();
    runtime
        .register(ClassBuilder::new("Buffer").implements("Limits"))
        .unwrap();

    assert_eq!(runtime.get_static("Buffer", "MAX").unwrap(), Value::Int(64));
}

#[test]
fn test_circular_dependency_sees_defaults() {
    let runtime = Runtime::new();
    runtime
        .register(
            ClassBuilder::new("Ping")
                .static_field("value", TypeTag::Int, FieldFlags::PUBLIC)
                .static_field("seen", TypeTag::Int, FieldFlags::PUBLIC)
                .static_block(|rt, class| {
                    let pong = rt.get_static("Pong", "value")?;
                    rt.put_static(class, "seen", pong)?;
                    rt.put_static(class, "value", Value::Int(1))
                }),
        )
        .unwrap();
    runtime
        .register(
            ClassBuilder::new("Pong")
                .static_field("value", TypeTag::Int, FieldFlags::PUBLIC)
                .static_field("seen", TypeTag::Int, FieldFlags::PUBLIC)
                .static_block(|rt, class| {
                    let ping = rt.get_static("Ping", "value")?;
                    rt.put_static(class, "seen", ping)?;
                    rt.put_static(class, "value", Value::Int(2))
                }),
        )
        .unwrap();

    runtime.ensure_initialized("Ping").unwrap();
    // Pong ran while Ping was still initializing and observed Ping.value == 0
    assert_eq!(runtime.get_static("Pong", "seen").unwrap(), Value::Int(0));
    assert_eq!(runtime.get_static("Ping", "seen").unwrap(), Value::Int(2));
}

#[test]
fn test_failure_is_sticky() {
    let runtime = Runtime::new();
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    runtime
        .register(
            ClassBuilder::new("Broken")
                .static_field("x", TypeTag::Int, FieldFlags::PUBLIC)
                .static_block(move |_, _| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(RuntimeError::thrown("ExceptionInInitializerError"))
                }),
        )
        .unwrap();

    let first = runtime.get_static("Broken", "x").unwrap_err();
    assert!(matches!(
        first,
        RuntimeError::Initialization(InitializationError::Failed { .. })
    ));

    let second = runtime.get_static("Broken", "x").unwrap_err();
    match second {
        RuntimeError::Initialization(InitializationError::PreviouslyFailed { class, cause }) => {
            assert_eq!(class, ClassId::new("Broken"));
            assert!(cause.contains("ExceptionInInitializerError"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(runtime.new_instance("Broken").is_err());
    assert_eq!(runtime.init_state("Broken").unwrap(), InitState::Failed);
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[test]
fn test_superclass_failure_fails_subclass() {
    let runtime = Runtime::new();
    runtime
        .register(ClassBuilder::new("BadBase").static_block(|_, _| Err(RuntimeError::thrown("nope"))))
        .unwrap();
    runtime
        .register(ClassBuilder::new("Sub").superclass("BadBase"))
        .unwrap();

    assert!(runtime.ensure_initialized("Sub").is_err());
    assert_eq!(runtime.init_state("BadBase").unwrap(), InitState::Failed);
    assert_eq!(runtime.init_state("Sub").unwrap(), InitState::Failed);
}

#[test]
fn test_array_element_access_triggers_initialization() {
    let runtime = Runtime::new();
    runtime
        .register(ClassBuilder::new("Elem").static_field_with(
            "k",
            TypeTag::Int,
            FieldFlags::PUBLIC,
            Value::Int(3),
        ))
        .unwrap();

    let array = runtime.new_array(TypeTag::Reference(ClassId::new("Elem")), 2).unwrap();
    assert_eq!(runtime.init_state("Elem").unwrap(), InitState::Uninitialized);
    assert_eq!(runtime.array_length(array).unwrap(), 2);
    assert_eq!(runtime.init_state("Elem").unwrap(), InitState::Uninitialized);

    assert_eq!(runtime.array_load(array, 0).unwrap(), Value::Null);
    assert_eq!(runtime.init_state("Elem").unwrap(), InitState::Initialized);
}

#[test]
fn test_unknown_class() {
    let runtime = Runtime::new();
    assert!(matches!(
        runtime.ensure_initialized("Ghost"),
        Err(RuntimeError::Initialization(InitializationError::ClassNotFound(_)))
    ));
}
