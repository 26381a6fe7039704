//! Shared fixture for bridge integration tests
//!
//! Class layout:
//!
//! ```text
//! app.Base            public; field 0 = count
//!   app.Derived       overrides describe()
//!   ext.Caller        subclass in another package
//! app.Peer            same package as Base
//! app.Alien           same package name as Base, other loader
//! ext.Stranger        unrelated, other package
//! app.Shape           interface: area(), perimeter()
//!   app.Square        implements area() only; field 0 = side
//! app.Lazy            static initializer counts its runs
//! app.Oops            extends java.lang.Throwable
//! ```

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rivet_engine::vm::method::AccessFlags;
use rivet_engine::{
    invoke_with_values, CallFrame, ClassDef, ClassId, EngineConfig, LoaderId, MethodDef, MethodId,
    NativeMethodEngine, ObjectRef, PrimitiveKind, Runtime, RuntimeBuilder, ShadowStack,
    ThreadContext, TypeRef, Value,
};

pub const BOOLEAN: TypeRef = TypeRef::Primitive(PrimitiveKind::Boolean);
pub const BYTE: TypeRef = TypeRef::Primitive(PrimitiveKind::Byte);
pub const CHAR: TypeRef = TypeRef::Primitive(PrimitiveKind::Char);
pub const SHORT: TypeRef = TypeRef::Primitive(PrimitiveKind::Short);
pub const INT: TypeRef = TypeRef::Primitive(PrimitiveKind::Int);
pub const LONG: TypeRef = TypeRef::Primitive(PrimitiveKind::Long);
pub const FLOAT: TypeRef = TypeRef::Primitive(PrimitiveKind::Float);
pub const DOUBLE: TypeRef = TypeRef::Primitive(PrimitiveKind::Double);

/// Method IDs of the fixture
#[derive(Debug, Clone, Copy)]
pub struct Methods {
    /// `public static int add(int, int)` on Base
    pub add: MethodId,
    /// `public static double sum_all(boolean, byte, char, short, int, long, float, double)`
    pub sum_all: MethodId,
    /// `public static long widen(long)` on Base, returns its argument
    pub widen: MethodId,
    /// `public int describe()`: 1 on Base, 2 on Derived
    pub describe: MethodId,
    /// `public int describe()` on Derived
    pub derived_describe: MethodId,
    /// `private int secret()` on Base, returns 42
    pub secret: MethodId,
    /// `protected int guarded()` on Base, returns 7
    pub guarded: MethodId,
    /// `protected static int guarded_static()` on Base, returns 11
    pub guarded_static: MethodId,
    /// `int internal()` on Base (package-private), returns 9
    pub internal: MethodId,
    /// `public void set_count(int)` on Base, writes field 0
    pub set_count: MethodId,
    /// `public void set_pair(int, int)` on Base, writes field 0 with the sum
    pub set_pair: MethodId,
    /// `public int count()` on Base, reads field 0
    pub count: MethodId,
    /// `app.Shape.area()`
    pub area: MethodId,
    /// `app.Shape.perimeter()`, not implemented by Square
    pub perimeter: MethodId,
    /// `app.Square.area()`: side * side
    pub square_area: MethodId,
    /// `app.Square.<init>(int side)`
    pub square_init: MethodId,
    /// `public static void fail()` on Base, throws app.Oops
    pub fail: MethodId,
    /// `public static java.lang.Object identity(java.lang.Object)`
    pub identity: MethodId,
    /// `public static int take_base(app.Base)`, returns 1
    pub take_base: MethodId,
    /// `public static int bad_result()`, body returns a long
    pub bad_result: MethodId,
    /// `public static int null_result()`, body returns null
    pub null_result: MethodId,
    /// `public static long boxed_result()`, body returns a boxed int 5
    pub boxed_result: MethodId,
    /// `public static int nested(int x)`, re-enters the bridge for add(x, x)
    pub nested: MethodId,
    /// `public static boolean park()`, suspends the mutator lock and reports
    /// whether an exclusive holder could get in
    pub park: MethodId,
    /// `public static int lazy_value()` on app.Lazy
    pub lazy_value: MethodId,
    /// `public static void unbound()`, no body registered
    pub unbound: MethodId,
}

/// A linked runtime with the fixture classes
pub struct Fixture {
    pub runtime: Arc<Runtime>,
    pub base: ClassId,
    pub derived: ClassId,
    pub caller: ClassId,
    pub peer: ClassId,
    pub alien: ClassId,
    pub stranger: ClassId,
    pub shape: ClassId,
    pub square: ClassId,
    pub lazy: ClassId,
    pub oops: ClassId,
    pub m: Methods,
    /// Number of method bodies entered
    pub entered: Arc<AtomicUsize>,
    /// Number of app.Lazy initializer runs
    pub init_runs: Arc<AtomicUsize>,
}

fn int_arg(frame: &CallFrame<'_, '_>, index: usize) -> i32 {
    frame.arg(index).as_i32().unwrap_or_default()
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        init_tracing();

        let mut b = RuntimeBuilder::with_config(config).unwrap();
        let core = b.core();
        let object = TypeRef::Reference(core.object);

        let base = b.define_class(ClassDef::new("app.Base").fields(1)).unwrap();
        let derived = b.define_class(ClassDef::new("app.Derived").extends(base)).unwrap();
        let caller = b.define_class(ClassDef::new("ext.Caller").extends(base)).unwrap();
        let peer = b.define_class(ClassDef::new("app.Peer")).unwrap();
        let alien = b
            .define_class(ClassDef::new("app.Alien").loader(LoaderId(7)))
            .unwrap();
        let stranger = b.define_class(ClassDef::new("ext.Stranger")).unwrap();
        let shape = b.define_class(ClassDef::interface("app.Shape")).unwrap();
        let square = b
            .define_class(ClassDef::new("app.Square").implements(shape).fields(1))
            .unwrap();
        let lazy = b.define_class(ClassDef::new("app.Lazy")).unwrap();
        let oops = b
            .define_class(ClassDef::new("app.Oops").extends(core.throwable))
            .unwrap();

        let stat = |name: &str| MethodDef::new(name).as_static();
        let m = Methods {
            add: b.define_method(base, stat("add").param(INT).param(INT).returns(INT)).unwrap(),
            sum_all: b
                .define_method(
                    base,
                    stat("sum_all")
                        .param(BOOLEAN)
                        .param(BYTE)
                        .param(CHAR)
                        .param(SHORT)
                        .param(INT)
                        .param(LONG)
                        .param(FLOAT)
                        .param(DOUBLE)
                        .returns(DOUBLE),
                )
                .unwrap(),
            widen: b.define_method(base, stat("widen").param(LONG).returns(LONG)).unwrap(),
            describe: b.define_method(base, MethodDef::new("describe").returns(INT)).unwrap(),
            derived_describe: b
                .define_method(derived, MethodDef::new("describe").returns(INT))
                .unwrap(),
            secret: b
                .define_method(
                    base,
                    MethodDef::new("secret").flags(AccessFlags::PRIVATE).returns(INT),
                )
                .unwrap(),
            guarded: b
                .define_method(
                    base,
                    MethodDef::new("guarded").flags(AccessFlags::PROTECTED).returns(INT),
                )
                .unwrap(),
            guarded_static: b
                .define_method(
                    base,
                    MethodDef::new("guarded_static")
                        .flags(AccessFlags::PROTECTED)
                        .as_static()
                        .returns(INT),
                )
                .unwrap(),
            internal: b
                .define_method(base, MethodDef::new("internal").flags(AccessFlags::NONE).returns(INT))
                .unwrap(),
            set_count: b.define_method(base, MethodDef::new("set_count").param(INT)).unwrap(),
            set_pair: b
                .define_method(base, MethodDef::new("set_pair").param(INT).param(INT))
                .unwrap(),
            count: b.define_method(base, MethodDef::new("count").returns(INT)).unwrap(),
            area: b.define_method(shape, MethodDef::new("area").returns(INT)).unwrap(),
            perimeter: b.define_method(shape, MethodDef::new("perimeter").returns(INT)).unwrap(),
            square_area: b.define_method(square, MethodDef::new("area").returns(INT)).unwrap(),
            square_init: b.define_method(square, MethodDef::constructor().param(INT)).unwrap(),
            fail: b.define_method(base, stat("fail")).unwrap(),
            identity: b
                .define_method(base, stat("identity").param(object).returns(object))
                .unwrap(),
            take_base: b
                .define_method(base, stat("take_base").param(TypeRef::Reference(base)).returns(INT))
                .unwrap(),
            bad_result: b.define_method(base, stat("bad_result").returns(INT)).unwrap(),
            null_result: b.define_method(base, stat("null_result").returns(INT)).unwrap(),
            boxed_result: b.define_method(base, stat("boxed_result").returns(LONG)).unwrap(),
            nested: b.define_method(base, stat("nested").param(INT).returns(INT)).unwrap(),
            park: b.define_method(base, stat("park").returns(BOOLEAN)).unwrap(),
            lazy_value: b.define_method(lazy, stat("lazy_value").returns(INT)).unwrap(),
            unbound: b.define_method(base, stat("unbound")).unwrap(),
        };

        let entered = Arc::new(AtomicUsize::new(0));
        let init_runs = Arc::new(AtomicUsize::new(0));
        let mut engine = NativeMethodEngine::new();

        let mut register = |id: MethodId, body: fn(&mut CallFrame<'_, '_>, &Ctx) -> Result<Value, rivet_engine::Thrown>| {
            let ctx = Ctx {
                entered: Arc::clone(&entered),
                init_runs: Arc::clone(&init_runs),
                add: m.add,
                oops,
            };
            engine.register(id, move |frame| {
                ctx.entered.fetch_add(1, Ordering::SeqCst);
                body(frame, &ctx)
            });
        };

        register(m.add, |f, _| Ok(Value::Int(int_arg(f, 0).wrapping_add(int_arg(f, 1)))));
        register(m.sum_all, |f, _| {
            let mut sum = 0.0;
            for arg in f.args {
                sum += match *arg {
                    Value::Boolean(v) => v as i32 as f64,
                    Value::Byte(v) => v as f64,
                    Value::Char(v) => v as f64,
                    Value::Short(v) => v as f64,
                    Value::Int(v) => v as f64,
                    Value::Long(v) => v as f64,
                    Value::Float(v) => v as f64,
                    Value::Double(v) => v,
                    _ => 0.0,
                };
            }
            Ok(Value::Double(sum))
        });
        register(m.widen, |f, _| Ok(f.arg(0)));
        register(m.describe, |_, _| Ok(Value::Int(1)));
        register(m.derived_describe, |_, _| Ok(Value::Int(2)));
        register(m.secret, |_, _| Ok(Value::Int(42)));
        register(m.guarded, |_, _| Ok(Value::Int(7)));
        register(m.guarded_static, |_, _| Ok(Value::Int(11)));
        register(m.internal, |_, _| Ok(Value::Int(9)));
        register(m.set_count, |f, _| {
            let this = receiver(f);
            f.runtime.heap().set_field(this, 0, f.arg(0)).unwrap();
            Ok(Value::Void)
        });
        register(m.set_pair, |f, _| {
            let this = receiver(f);
            let sum = int_arg(f, 0) + int_arg(f, 1);
            f.runtime.heap().set_field(this, 0, Value::Int(sum)).unwrap();
            Ok(Value::Void)
        });
        register(m.count, |f, _| {
            let this = receiver(f);
            Ok(f.runtime.heap().get_field(this, 0).unwrap_or_default())
        });
        register(m.square_area, |f, _| {
            let this = receiver(f);
            let side = f.runtime.heap().get_field(this, 0).and_then(|v| v.as_i32()).unwrap_or(0);
            Ok(Value::Int(side * side))
        });
        register(m.square_init, |f, _| {
            let this = receiver(f);
            f.runtime.heap().set_field(this, 0, f.arg(0)).unwrap();
            Ok(Value::Void)
        });
        register(m.fail, |f, ctx| Err(f.throw_new(ctx.oops, "boom")));
        register(m.identity, |f, _| Ok(f.arg(0)));
        register(m.take_base, |_, _| Ok(Value::Int(1)));
        register(m.bad_result, |_, _| Ok(Value::Long(1)));
        register(m.null_result, |_, _| Ok(Value::null()));
        register(m.boxed_result, |f, _| {
            let int_box = f.runtime.classes().core().box_class(PrimitiveKind::Int).unwrap();
            Ok(Value::Object(Some(f.runtime.heap().alloc_boxed(int_box, Value::Int(5)))))
        });
        register(m.nested, |f, ctx| {
            let runtime = f.runtime;
            let x = f.arg(0);
            let handle = runtime.handle_for(ctx.add);
            match invoke_with_values(runtime, f.thread, None, handle, &[x, x]) {
                Ok(value) => Ok(value),
                Err(_) => Err(f.throw_new(ctx.oops, "nested call failed")),
            }
        });
        register(m.park, |f, _| {
            let runtime = f.runtime;
            let writer_got_in = f.guard.suspended(|| runtime.mutator().try_exclusive().is_some());
            Ok(Value::Boolean(writer_got_in))
        });
        register(m.lazy_value, |_, ctx| {
            Ok(Value::Int(ctx.init_runs.load(Ordering::SeqCst) as i32))
        });

        let runs = Arc::clone(&init_runs);
        engine.register_initializer(lazy, move |_, _| {
            runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let runtime = Arc::new(b.build(Arc::new(engine)));
        Self {
            runtime,
            base,
            derived,
            caller,
            peer,
            alien,
            stranger,
            shape,
            square,
            lazy,
            oops,
            m,
            entered,
            init_runs,
        }
    }

    /// Number of method bodies entered so far
    pub fn entered(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }

    /// A thread whose innermost managed frame belongs to `class`
    pub fn thread_in(&self, class: ClassId) -> ThreadContext {
        ThreadContext::attached("test", ShadowStack::with_frames([class]))
    }

    /// Read field 0 of an instance
    pub fn field(&self, obj: ObjectRef) -> Value {
        self.runtime.heap().get_field(obj, 0).unwrap()
    }

    /// Box a primitive for reflective argument arrays
    pub fn boxed(&self, value: Value) -> Option<ObjectRef> {
        let kind = value.kind().unwrap();
        rivet_engine::vm::reflect::box_primitive(&self.runtime, kind, value)
    }

    /// Allocate an `Object[]` of arguments
    pub fn args(&self, elements: Vec<Option<ObjectRef>>) -> Option<ObjectRef> {
        Some(self.runtime.alloc_object_array(elements))
    }
}

struct Ctx {
    entered: Arc<AtomicUsize>,
    init_runs: Arc<AtomicUsize>,
    add: MethodId,
    oops: ClassId,
}

fn receiver(frame: &CallFrame<'_, '_>) -> ObjectRef {
    frame.receiver.unwrap()
}

/// Install a test subscriber once; filtered by `RIVET_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("RIVET_LOG"))
        .with_test_writer()
        .try_init();
}
