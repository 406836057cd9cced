pub mod cpu;

pub use cpu::{AcceleratorMode, RefEngine, RefTensor};

use std::sync::Arc;

use tensorbridge::engine::registry::register_engine;
use tensorbridge::BridgeConfig;

/// Accelerator emulation for a registered engine. Enough devices are emulated
/// for the configured `cuda()` target to exist.
pub fn accelerator_mode(config: &BridgeConfig) -> AcceleratorMode {
    if config.emulate_accelerator {
        AcceleratorMode::Emulated {
            devices: config.accelerator_index.saturating_add(1),
        }
    } else {
        AcceleratorMode::Unavailable
    }
}

/// Register the reference engine with the global engine registry.
///
/// This is called automatically via a static initializer, but can also be called
/// manually to ensure the engine is registered. The engine is registered under
/// both "ref-cpu" and "cpu".
pub fn register_ref_engine() {
    let constructor = || {
        let mode = accelerator_mode(tensorbridge::config::global());
        Arc::new(RefEngine::with_accelerator(mode)) as Arc<dyn tensorbridge::TensorEngine>
    };

    register_engine("ref-cpu", constructor);
    register_engine("cpu", constructor);
}

// Auto-register on library load
#[cfg(not(target_family = "wasm"))]
#[used]
#[link_section = ".init_array"]
static REGISTER_REF_ENGINE: extern "C" fn() = {
    extern "C" fn register() {
        register_ref_engine();
    }
    register
};
