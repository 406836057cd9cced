//! Script-callable constructors: `ones(shape, requiresGrad)` and
//! `zeros(shape, requiresGrad)`.
//!
//! Arguments are fully validated before the engine is asked to allocate.

use crate::bridge::{Invocation, Tensor};
use crate::engine::{TensorEngine, TensorOptions};
use crate::error::{BridgeError, BridgeResult};
use crate::grad_mode;
use crate::host::HostValue;

/// Number of arguments every factory requires.
pub const FACTORY_ARITY: usize = 2;

/// Tensor of the requested shape filled with `1.0`.
pub fn ones(engine: &dyn TensorEngine, args: &[HostValue]) -> BridgeResult<Tensor> {
    filled(engine, "ones", 1.0, args)
}

/// Tensor of the requested shape filled with `0.0`.
pub fn zeros(engine: &dyn TensorEngine, args: &[HostValue]) -> BridgeResult<Tensor> {
    filled(engine, "zeros", 0.0, args)
}

fn filled(
    engine: &dyn TensorEngine,
    function: &'static str,
    value: f32,
    args: &[HostValue],
) -> BridgeResult<Tensor> {
    let (dims, requires_grad) = parse_args(function, args)?;

    let _no_grad = grad_mode::no_grad();
    tracing::debug!(
        engine = engine.engine_name(),
        function,
        ?dims,
        requires_grad,
        "allocating tensor"
    );
    let handle = engine.full(
        &dims,
        value,
        TensorOptions::default().requires_grad(requires_grad),
    )?;

    let mut tensor = Tensor::construct(Invocation::Factory)?;
    tensor.set_tensor(handle);
    Ok(tensor)
}

/// Validates `(shape: int[], requiresGrad: bool)`. Extra arguments are ignored.
fn parse_args(function: &'static str, args: &[HostValue]) -> BridgeResult<(Vec<i64>, bool)> {
    if args.len() < FACTORY_ARITY {
        return Err(BridgeError::Arity {
            function,
            expected: FACTORY_ARITY,
            found: args.len(),
        });
    }

    let (Some(items), Some(requires_grad)) = (args[0].as_array(), args[1].as_bool()) else {
        return Err(BridgeError::type_mismatch(format!(
            "{function}: expected (array, boolean), got ({}, {})",
            args[0].kind(),
            args[1].kind()
        )));
    };

    let dims = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.as_integer().ok_or_else(|| {
                BridgeError::type_mismatch(format!(
                    "{function}: shape element {index} must be an integer, got {}",
                    item.kind()
                ))
            })
        })
        .collect::<BridgeResult<Vec<i64>>>()?;

    Ok((dims, requires_grad))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_arguments_are_an_arity_error() {
        let err = parse_args("ones", &[HostValue::from([1])]).unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Arity {
                function: "ones",
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn argument_kinds_are_checked() {
        let err = parse_args("ones", &[HostValue::from("x"), HostValue::Bool(false)]).unwrap_err();
        assert!(matches!(err, BridgeError::TypeMismatch(_)));

        let err = parse_args("zeros", &[HostValue::from([2]), HostValue::Number(1.0)]).unwrap_err();
        assert!(matches!(err, BridgeError::TypeMismatch(_)));
    }

    #[test]
    fn shape_elements_must_be_integers() {
        let shape = HostValue::Array(vec![HostValue::Number(2.0), HostValue::Number(1.5)]);
        let err = parse_args("ones", &[shape, false.into()]).unwrap_err();
        assert!(err.to_string().contains("shape element 1"));
    }

    #[test]
    fn extra_arguments_are_ignored() {
        let (dims, grad) = parse_args(
            "zeros",
            &[HostValue::from([2, 3]), true.into(), HostValue::Null],
        )
        .unwrap();
        assert_eq!(dims, vec![2, 3]);
        assert!(grad);
    }

    #[test]
    fn negative_extents_are_left_to_the_engine() {
        let (dims, _) = parse_args("ones", &[HostValue::from([-1]), false.into()]).unwrap();
        assert_eq!(dims, vec![-1]);
    }
}
