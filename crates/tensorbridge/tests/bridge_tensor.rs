use std::sync::atomic::{AtomicUsize, Ordering};

use rand::{rngs::StdRng, Rng, SeedableRng};
use tensorbridge::factory::{ones, zeros};
use tensorbridge::{
    grad_mode, BridgeError, Device, EngineError, HostValue, Invocation, Tensor, TensorEngine,
    TensorHandle, TensorOptions,
};
use tensorbridge_backend_ref_cpu::{AcceleratorMode, RefEngine, RefTensor};

fn args(dims: &[i64], requires_grad: bool) -> Vec<HostValue> {
    vec![
        HostValue::Array(dims.iter().map(|&d| HostValue::Number(d as f64)).collect()),
        HostValue::Bool(requires_grad),
    ]
}

fn iota(engine: &RefEngine, dims: Vec<usize>) -> Tensor {
    let numel = dims.iter().product::<usize>();
    let values = (0..numel).map(|v| v as f32).collect();
    Tensor::from_handle(
        engine
            .from_vec(dims, values, TensorOptions::default())
            .unwrap(),
    )
}

/// Reference engine that counts allocation requests.
#[derive(Default)]
struct CountingEngine {
    inner: RefEngine,
    allocations: AtomicUsize,
}

impl CountingEngine {
    fn allocations(&self) -> usize {
        self.allocations.load(Ordering::SeqCst)
    }
}

impl TensorEngine for CountingEngine {
    fn engine_name(&self) -> &str {
        "counting"
    }

    fn accelerator_available(&self) -> bool {
        self.inner.accelerator_available()
    }

    fn full(
        &self,
        dims: &[i64],
        value: f32,
        options: TensorOptions,
    ) -> tensorbridge::EngineResult<TensorHandle> {
        self.allocations.fetch_add(1, Ordering::SeqCst);
        self.inner.full(dims, value, options)
    }
}

#[test]
fn direct_construction_is_rejected() {
    let err = Tensor::construct(Invocation::Direct).unwrap_err();
    assert!(matches!(err, BridgeError::InvalidInvocation(_)));

    let empty = Tensor::construct(Invocation::Factory).unwrap();
    assert!(!empty.is_defined());
    assert!(matches!(
        empty.sizes(),
        Err(BridgeError::Engine(EngineError::UndefinedTensor))
    ));
    assert_eq!(empty.to_string(), "Tensor[undefined]");
}

#[test]
fn zeros_reports_requested_sizes() {
    let engine = RefEngine::new();
    let tensor = zeros(&engine, &args(&[2, 3], false)).unwrap();
    assert_eq!(tensor.sizes().unwrap(), vec![2, 3]);
    assert_eq!(tensor.type_name().unwrap(), "float_cpu");
    assert!(!tensor.requires_grad().unwrap());
}

#[test]
fn factories_fill_constants() {
    let engine = RefEngine::new();
    for n in [0, 1, 7, 64] {
        let one = ones(&engine, &args(&[n], false)).unwrap();
        let data = one.data().unwrap();
        assert_eq!(data.len(), n as usize);
        assert!(data.iter().all(|&v| v == 1.0));

        let zero = zeros(&engine, &args(&[n], false)).unwrap();
        assert!(zero.data().unwrap().iter().all(|&v| v == 0.0));
    }
}

#[test]
fn factory_argument_errors() {
    let engine = RefEngine::new();
    assert!(matches!(
        ones(&engine, &[HostValue::from([1])]),
        Err(BridgeError::Arity { found: 1, .. })
    ));
    assert!(matches!(
        ones(&engine, &[HostValue::from("x"), HostValue::Bool(false)]),
        Err(BridgeError::TypeMismatch(_))
    ));
    assert!(matches!(
        zeros(&engine, &args(&[2, -3], false)),
        Err(BridgeError::Engine(EngineError::NegativeDimension {
            index: 1,
            dim: -3
        }))
    ));
}

#[test]
fn requires_grad_flag_is_honored() {
    let engine = RefEngine::new();
    let mut tensor = ones(&engine, &args(&[3], true)).unwrap();
    assert!(tensor.requires_grad().unwrap());

    // Accessors run without grad tracking, so writing into the leaf is allowed.
    tensor.set_data(&[1.0, 2.0, 3.0]).unwrap();
    assert_eq!(tensor.data().unwrap(), vec![1.0, 2.0, 3.0]);
    assert!(grad_mode::is_enabled());
}

#[test]
fn data_round_trips_exactly() {
    let engine = RefEngine::new();
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for dims in [vec![4], vec![2, 3], vec![2, 3, 4], vec![]] {
        let mut tensor = zeros(&engine, &args(&dims, false)).unwrap();
        let numel = tensor.tensor().unwrap().numel();
        let buffer: Vec<f32> = (0..numel).map(|_| rng.gen_range(-1e6..1e6)).collect();
        tensor.assign_data(&HostValue::Float32Array(buffer.clone())).unwrap();
        assert_eq!(tensor.data().unwrap(), buffer);
    }
}

#[test]
fn data_reads_are_independent_copies() {
    let engine = RefEngine::new();
    let tensor = ones(&engine, &args(&[4], false)).unwrap();
    let mut first = tensor.data().unwrap();
    let second = tensor.data().unwrap();
    assert_eq!(first, second);

    first[0] = 42.0;
    assert_eq!(second[0], 1.0);
    assert_eq!(tensor.data().unwrap()[0], 1.0);
}

#[test]
fn sizes_is_a_snapshot() {
    let engine = RefEngine::new();
    let tensor = zeros(&engine, &args(&[2, 5], false)).unwrap();
    let mut sizes = tensor.sizes().unwrap();
    sizes[0] = 99;
    assert_eq!(tensor.sizes().unwrap(), vec![2, 5]);
}

#[test]
fn data_setter_rejects_wrong_values() {
    let engine = RefEngine::new();
    let mut tensor = zeros(&engine, &args(&[3], false)).unwrap();

    let err = tensor
        .assign_data(&HostValue::Array(vec![HostValue::Number(1.0)]))
        .unwrap_err();
    assert!(matches!(err, BridgeError::TypeMismatch(_)));

    let err = tensor.set_data(&[1.0, 2.0]).unwrap_err();
    assert!(matches!(err, BridgeError::TypeMismatch(_)));
    assert_eq!(tensor.data().unwrap(), vec![0.0; 3]);
}

#[test]
fn writes_through_non_contiguous_handle_reach_storage() {
    let engine = RefEngine::new();
    let base = iota(&engine, vec![2, 3]);
    let view = base.tensor().unwrap().transpose(0, 1).unwrap();
    let mut transposed = Tensor::from_handle(view);
    assert_eq!(transposed.sizes().unwrap(), vec![3, 2]);
    assert_eq!(
        transposed.data().unwrap(),
        vec![0.0, 3.0, 1.0, 4.0, 2.0, 5.0]
    );

    transposed
        .set_data(&[10.0, 13.0, 11.0, 14.0, 12.0, 15.0])
        .unwrap();
    assert_eq!(
        transposed.data().unwrap(),
        vec![10.0, 13.0, 11.0, 14.0, 12.0, 15.0]
    );
    // The view and the original share storage, so the original sees the write.
    assert_eq!(
        base.data().unwrap(),
        vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0]
    );
}

#[test]
fn device_round_trip_preserves_data() {
    let engine = RefEngine::new();
    let mut tensor = iota(&engine, vec![2, 2]);
    let before = tensor.data().unwrap();

    tensor.cuda().unwrap();
    assert_eq!(tensor.device().unwrap(), Device::Cuda(0));
    assert_eq!(tensor.type_name().unwrap(), "float_cuda:0");
    assert_eq!(tensor.data().unwrap(), before);

    tensor.cpu().unwrap();
    assert_eq!(tensor.type_name().unwrap(), "float_cpu");
    assert_eq!(tensor.data().unwrap(), before);
}

#[test]
fn writes_to_accelerator_tensor_land_on_device() {
    let engine = RefEngine::new();
    let mut tensor = zeros(&engine, &args(&[3], false)).unwrap();
    tensor.cuda().unwrap();
    let held = tensor.tensor().unwrap();

    tensor.set_data(&[1.0, 2.0, 3.0]).unwrap();
    assert!(tensor.tensor().unwrap().same_tensor(&held));
    assert_eq!(tensor.device().unwrap(), Device::Cuda(0));
    assert_eq!(tensor.data().unwrap(), vec![1.0, 2.0, 3.0]);
}

#[test]
fn failed_transfer_leaves_handle_unchanged() {
    let engine = RefEngine::with_accelerator(AcceleratorMode::Unavailable);
    let mut tensor = ones(&engine, &args(&[2], false)).unwrap();
    let held = tensor.tensor().unwrap();

    let err = tensor.cuda().unwrap_err();
    assert!(matches!(
        err,
        BridgeError::Engine(EngineError::AcceleratorUnavailable(Device::Cuda(0)))
    ));
    assert!(tensor.tensor().unwrap().same_tensor(&held));
    assert_eq!(tensor.type_name().unwrap(), "float_cpu");
}

#[test]
fn transfer_to_current_device_keeps_handle() {
    let engine = RefEngine::new();
    let mut tensor = ones(&engine, &args(&[2], false)).unwrap();
    let held = tensor.tensor().unwrap();
    tensor.cpu().unwrap();
    assert!(tensor.tensor().unwrap().same_tensor(&held));
}

#[test]
fn handles_share_storage_and_release_once() {
    let engine = RefEngine::new();
    let tensor = ones(&engine, &args(&[2, 2], false)).unwrap();
    let handle = tensor.tensor().unwrap();
    assert_eq!(handle.reference_count(), 2);

    let mut alias = Tensor::construct(Invocation::Factory).unwrap();
    alias.set_tensor(handle.clone());
    assert_eq!(handle.reference_count(), 3);
    alias.set_data(&[5.0; 4]).unwrap();
    assert_eq!(tensor.data().unwrap(), vec![5.0; 4]);

    drop(alias);
    assert_eq!(handle.reference_count(), 2);
    drop(tensor);
    assert_eq!(handle.reference_count(), 1);
    let native = handle.downcast_ref::<RefTensor>().unwrap();
    assert_eq!(native.storage_references(), 1);
}

#[test]
fn to_string_embeds_type_and_size() {
    let engine = RefEngine::new();
    let mut tensor = zeros(&engine, &args(&[2, 3], false)).unwrap();
    assert_eq!(tensor.to_string(), "Tensor[Type=float_cpu, Size=[2, 3]]");
    tensor.cuda().unwrap();
    assert_eq!(tensor.to_string(), "Tensor[Type=float_cuda:0, Size=[2, 3]]");
}

#[test]
fn accessors_restore_grad_mode() {
    let engine = RefEngine::new();
    let mut tensor = ones(&engine, &args(&[1], true)).unwrap();
    {
        let _outer = grad_mode::no_grad();
        tensor.set_data(&[2.0]).unwrap();
        assert!(!grad_mode::is_enabled());
    }
    assert!(grad_mode::is_enabled());
    assert!(matches!(
        tensor.set_data(&[1.0, 2.0]),
        Err(BridgeError::TypeMismatch(_))
    ));
    assert!(grad_mode::is_enabled());
    assert!(engine.accelerator_available());
}

#[test]
fn invalid_factory_arguments_never_reach_the_engine() {
    let engine = CountingEngine::default();
    let rejected = [
        vec![],
        vec![HostValue::from([2i64, 3])],
        vec![HostValue::from("2x3"), HostValue::Bool(false)],
        vec![HostValue::from([2i64, 3]), HostValue::Number(1.0)],
        vec![
            HostValue::Array(vec![HostValue::Number(2.5)]),
            HostValue::Bool(false),
        ],
        vec![
            HostValue::Array(vec![HostValue::Number(2.0), HostValue::Null]),
            HostValue::Bool(true),
        ],
    ];
    for args in &rejected {
        assert!(ones(&engine, args).is_err(), "{args:?} was accepted");
        assert!(zeros(&engine, args).is_err(), "{args:?} was accepted");
    }
    assert_eq!(engine.allocations(), 0);

    zeros(&engine, &args(&[2, 3], false)).unwrap();
    assert_eq!(engine.allocations(), 1);
}

#[test]
fn oversized_factory_shape_is_an_engine_error() {
    let engine = RefEngine::new();
    let err = ones(&engine, &args(&[1 << 62], false)).unwrap_err();
    assert!(
        matches!(err, BridgeError::Engine(EngineError::Backend(_))),
        "{err:?}"
    );
}
