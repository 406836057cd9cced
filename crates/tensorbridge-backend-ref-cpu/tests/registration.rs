use tensorbridge::engine::registry;
use tensorbridge::{config, Device, TensorEngine, TensorOptions};
use tensorbridge_backend_ref_cpu::register_ref_engine;

#[test]
fn registers_under_both_names() {
    register_ref_engine();
    for name in ["ref-cpu", "cpu"] {
        assert!(registry::has_engine(name), "{name} missing");
        let engine = registry::create_engine(name).unwrap();
        assert_eq!(engine.engine_name(), "ref-cpu");
    }
}

#[test]
fn registered_engine_follows_global_config() {
    register_ref_engine();
    let config = config::global();
    let engine = registry::create_engine("ref-cpu").unwrap();
    assert_eq!(engine.accelerator_available(), config.emulate_accelerator);

    let handle = engine.full(&[3], 2.0, TensorOptions::default()).unwrap();
    let moved = handle.to_device(config.accelerator_device());
    if config.emulate_accelerator {
        assert_eq!(moved.unwrap().device(), Device::Cuda(config.accelerator_index));
    } else {
        assert!(moved.is_err());
    }
}
