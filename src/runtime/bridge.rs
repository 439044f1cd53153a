//! Binds import table entries to engine functions.
//!
//! Every import is bound with the signature the module declares for it, so a
//! module may declare `puts` as `(i32) -> ()` or `(i32) -> i32` and still link.
//! Arguments are coerced from engine values on each call and the primitive's
//! result, if any, is written back in the declared result type.

use wasmtime::{AsContextMut, Caller, Func, FuncType, Store, Val, ValType};

use crate::error::{Error, Result};

use super::context::HostContext;
use super::hooks::{self, Signal};
use super::imports::{HostImport, ImportEntry};
use super::memory::AddressableMemory;
use super::primitives;

pub(crate) fn bind_import(
    store: &mut Store<HostContext>,
    entry: ImportEntry,
    ty: &FuncType,
) -> Result<Func> {
    match entry {
        ImportEntry::Implemented(import) => {
            check_signature(import, ty)?;
            let result_types: Vec<ValType> = ty.results().collect();
            Ok(Func::new(
                &mut *store,
                ty.clone(),
                move |mut caller, params, results| {
                    let value = invoke(import, &mut caller, params).map_err(wasmtime::Error::new)?;
                    store_results(results, &result_types, value);
                    Ok(())
                },
            ))
        }
        ImportEntry::Unsupported(name) => Ok(Func::new(
            &mut *store,
            ty.clone(),
            move |_caller, _params, _results| {
                tracing::warn!(target: "host.import", import = %name, "unsupported import called");
                Err(wasmtime::Error::new(hooks::unsupported(&name)))
            },
        )),
    }
}

/// Rejects declared signatures the import cannot be called through.
pub(crate) fn check_signature(import: HostImport, ty: &FuncType) -> Result<()> {
    let reject = |message: String| {
        Err(Error::ImportSignature {
            name: import.name().to_string(),
            message,
        })
    };
    let results = ty.results().len();
    if results > 1 {
        return reject(format!("declares {results} results, at most one is supported"));
    }
    if let Some(result) = ty.results().find(|ty| !is_numeric(ty)) {
        return reject(format!("declares non-numeric result `{result}`"));
    }
    match import.arity() {
        None => {
            if let Some(param) = ty.params().find(|ty| !is_numeric(ty)) {
                return reject(format!("declares non-numeric parameter `{param}`"));
            }
        }
        Some(arity) => {
            let declared = ty.params().len();
            if declared != arity {
                return reject(format!(
                    "expects {import}{}, module declares {declared} parameter(s)",
                    import.parameters()
                ));
            }
            if let Some(param) = ty.params().find(|ty| !is_integer(ty)) {
                return reject(format!("declares non-integer parameter `{param}`"));
            }
        }
    }
    Ok(())
}

fn invoke(
    import: HostImport,
    caller: &mut Caller<'_, HostContext>,
    params: &[Val],
) -> std::result::Result<Option<i64>, Signal> {
    tracing::trace!(target: "host.import", import = import.name(), args = params.len());
    match import {
        HostImport::Print => {
            let message = render_values(params);
            caller.data_mut().output_mut().flush(&message);
            Ok(None)
        }
        HostImport::Abort => Err(hooks::abort(caller.data_mut().exit_status_mut())),
        HostImport::Exit => {
            let [code] = params else {
                return Err(arity_mismatch(import));
            };
            let code = value_as_i32(code, "exit code")?;
            Err(hooks::exit(caller.data_mut().exit_status_mut(), code))
        }
        HostImport::Putchar => {
            let [ch] = params else {
                return Err(arity_mismatch(import));
            };
            let ch = value_as_i32(ch, "putchar ch")?;
            let written = primitives::emit_char(caller.data_mut().output_mut(), ch);
            Ok(Some(i64::from(written)))
        }
        HostImport::Puts => {
            let [addr] = params else {
                return Err(arity_mismatch(import));
            };
            let addr = value_as_u32(addr, "puts str")?;
            let (memory, context) = memory_view(caller)?;
            primitives::emit_cstring(&memory, context.output_mut(), addr)?;
            Ok(None)
        }
        HostImport::Memcpy | HostImport::Mempcpy => {
            let [dst, src, len] = params else {
                return Err(arity_mismatch(import));
            };
            let dst = value_as_u32(dst, "memcpy dest")?;
            let src = value_as_u32(src, "memcpy src")?;
            let len = value_as_u32(len, "memcpy len")?;
            let (mut memory, _) = memory_view(caller)?;
            let addr = if import == HostImport::Mempcpy {
                primitives::copy_returning_end(&mut memory, dst, src, len)?
            } else {
                primitives::copy(&mut memory, dst, src, len)?
            };
            Ok(Some(i64::from(addr)))
        }
        HostImport::Memset => {
            let [ptr, value, len] = params else {
                return Err(arity_mismatch(import));
            };
            let ptr = value_as_u32(ptr, "memset ptr")?;
            let value = value_as_i32(value, "memset value")?;
            let len = value_as_u32(len, "memset len")?;
            let (mut memory, _) = memory_view(caller)?;
            let addr = primitives::fill(&mut memory, ptr, value, len)?;
            Ok(Some(i64::from(addr)))
        }
        HostImport::Memcmp => {
            let [lhs, rhs, len] = params else {
                return Err(arity_mismatch(import));
            };
            let lhs = value_as_u32(lhs, "memcmp lhs")?;
            let rhs = value_as_u32(rhs, "memcmp rhs")?;
            let len = value_as_u32(len, "memcmp len")?;
            let (memory, _) = memory_view(caller)?;
            let ordering = primitives::compare(&memory, lhs, rhs, len)?;
            Ok(Some(i64::from(ordering)))
        }
        HostImport::Strchr => {
            let [addr, ch] = params else {
                return Err(arity_mismatch(import));
            };
            let addr = value_as_u32(addr, "strchr str")?;
            let ch = value_as_i32(ch, "strchr ch")?;
            let (memory, _) = memory_view(caller)?;
            let found = primitives::find_char(&memory, addr, ch)?;
            Ok(Some(i64::from(found)))
        }
        HostImport::Strcmp => {
            let [lhs, rhs] = params else {
                return Err(arity_mismatch(import));
            };
            let lhs = value_as_u32(lhs, "strcmp lhs")?;
            let rhs = value_as_u32(rhs, "strcmp rhs")?;
            let (memory, _) = memory_view(caller)?;
            let ordering = primitives::string_compare(&memory, lhs, rhs)?;
            Ok(Some(i64::from(ordering)))
        }
        HostImport::Strlen => {
            let [addr] = params else {
                return Err(arity_mismatch(import));
            };
            let addr = value_as_u32(addr, "strlen str")?;
            let (memory, _) = memory_view(caller)?;
            let len = primitives::string_length(&memory, addr)?;
            Ok(Some(i64::from(len)))
        }
    }
}

fn memory_view<'c>(
    caller: &'c mut Caller<'_, HostContext>,
) -> std::result::Result<(AddressableMemory<'c>, &'c mut HostContext), Signal> {
    let memory = caller
        .data()
        .memory()
        .ok_or_else(|| Signal::Unknown("no linear memory is bound to the host".into()))?;
    let (bytes, context) = memory.data_and_store_mut(caller.as_context_mut());
    Ok((AddressableMemory::new(bytes), context))
}

fn arity_mismatch(import: HostImport) -> Signal {
    Signal::Unknown(format!("{import} expects {}", import.parameters()))
}

fn is_integer(ty: &ValType) -> bool {
    matches!(ty, ValType::I32 | ValType::I64)
}

fn is_numeric(ty: &ValType) -> bool {
    matches!(ty, ValType::I32 | ValType::I64 | ValType::F32 | ValType::F64)
}

/// Address or count argument. `i32` values are reinterpreted as unsigned.
fn value_as_u32(value: &Val, context: &str) -> std::result::Result<u32, Signal> {
    match value {
        Val::I32(v) => Ok(u32::from_le_bytes(v.to_le_bytes())),
        Val::I64(v) => u32::try_from(*v)
            .map_err(|_| Signal::Unknown(format!("{context} received out-of-range value {v}"))),
        _ => Err(Signal::Unknown(format!("{context} expected integer argument"))),
    }
}

fn value_as_i32(value: &Val, context: &str) -> std::result::Result<i32, Signal> {
    match value {
        Val::I32(v) => Ok(*v),
        Val::I64(v) => i32::try_from(*v)
            .map_err(|_| Signal::Unknown(format!("{context} received out-of-range value {v}"))),
        _ => Err(Signal::Unknown(format!("{context} expected integer argument"))),
    }
}

fn render_values(params: &[Val]) -> String {
    params
        .iter()
        .map(|value| match value {
            Val::I32(v) => v.to_string(),
            Val::I64(v) => v.to_string(),
            Val::F32(bits) => f32::from_bits(*bits).to_string(),
            Val::F64(bits) => f64::from_bits(*bits).to_string(),
            other => format!("{other:?}"),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Writes `value` into every declared result slot, or zero when the
/// primitive produced nothing. `i32` slots receive the low 32 bits.
fn store_results(results: &mut [Val], types: &[ValType], value: Option<i64>) {
    let value = value.unwrap_or(0);
    for (slot, ty) in results.iter_mut().zip(types) {
        *slot = match ty {
            ValType::I64 => Val::I64(value),
            ValType::F32 => Val::F32(f32_from(value).to_bits()),
            ValType::F64 => Val::F64(f64_from(value).to_bits()),
            _ => Val::I32(low_i32(value)),
        };
    }
}

fn low_i32(value: i64) -> i32 {
    let bytes = value.to_le_bytes();
    i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[allow(clippy::cast_precision_loss)]
fn f32_from(value: i64) -> f32 {
    value as f32
}

#[allow(clippy::cast_precision_loss)]
fn f64_from(value: i64) -> f64 {
    value as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasmtime::Engine;

    fn func_type(params: &[ValType], results: &[ValType]) -> FuncType {
        FuncType::new(&Engine::default(), params.iter().cloned(), results.iter().cloned())
    }

    #[test]
    fn accepts_c_style_signatures() {
        let memcpy = func_type(&[ValType::I32, ValType::I32, ValType::I32], &[ValType::I32]);
        assert!(check_signature(HostImport::Memcpy, &memcpy).is_ok());

        let puts_void = func_type(&[ValType::I32], &[]);
        let puts_int = func_type(&[ValType::I32], &[ValType::I32]);
        assert!(check_signature(HostImport::Puts, &puts_void).is_ok());
        assert!(check_signature(HostImport::Puts, &puts_int).is_ok());

        let print_mixed = func_type(&[ValType::I64, ValType::F64], &[]);
        assert!(check_signature(HostImport::Print, &print_mixed).is_ok());
    }

    #[test]
    fn rejects_wrong_arity_and_types() {
        let strlen = func_type(&[ValType::I32, ValType::I32], &[ValType::I32]);
        let err = check_signature(HostImport::Strlen, &strlen).expect_err("arity");
        assert!(err.to_string().contains("strlen(str)"), "{err}");

        let exit = func_type(&[ValType::F32], &[]);
        assert!(check_signature(HostImport::Exit, &exit).is_err());

        let abort = func_type(&[], &[ValType::I32, ValType::I32]);
        assert!(check_signature(HostImport::Abort, &abort).is_err());
    }

    #[test]
    fn values_coerce_to_addresses() {
        assert_eq!(value_as_u32(&Val::I32(-1), "ctx"), Ok(u32::MAX));
        assert_eq!(value_as_u32(&Val::I64(42), "ctx"), Ok(42));
        assert!(value_as_u32(&Val::I64(-1), "ctx").is_err());
        assert!(value_as_i32(&Val::F32(0), "ctx").is_err());
    }

    #[test]
    fn print_renders_space_separated_values() {
        let rendered = render_values(&[
            Val::I32(-5),
            Val::I64(1 << 40),
            Val::F64(2.5f64.to_bits()),
        ]);
        assert_eq!(rendered, "-5 1099511627776 2.5");
        assert_eq!(render_values(&[]), "");
    }

    #[test]
    fn results_follow_declared_types() {
        let mut results = [Val::I32(0), Val::I64(0)];
        store_results(&mut results[..1], &[ValType::I32], Some(i64::from(u32::MAX)));
        assert!(matches!(results[0], Val::I32(-1)));
        store_results(&mut results[1..], &[ValType::I64], None);
        assert!(matches!(results[1], Val::I64(0)));
    }
}
