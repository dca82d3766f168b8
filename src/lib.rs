//! Free-space placement engine.
//!
//! Samples collision-free planar poses (position + yaw) for a manipulated
//! object on a surface cluttered with static obstacles. The JSON entry
//! point [`sample_json`] takes an `EngineParams` document and returns a
//! `SamplingResult` document; with the `python` feature it is also
//! importable from Python.

#[cfg(feature = "python")]
use pyo3::prelude::*;

pub mod collision;
pub mod error;
pub mod free_space;
pub mod object;
pub mod primitives;
pub mod prng;
pub mod types;

pub use error::SamplingError;
pub use free_space::{sample, FreeSpace, Scenario};
pub use object::RigidObject;

/// Run the sampler on a JSON `EngineParams` document and return the
/// `SamplingResult` as JSON.
pub fn sample_json(params_json: &str) -> Result<String, SamplingError> {
    let params: types::EngineParams = serde_json::from_str(params_json).map_err(|e| {
        SamplingError::MalformedInput(format!("Invalid engine_params JSON: {e}"))
    })?;
    let scenario = Scenario::from_record(params.scenario)?;
    let result = sample(&scenario, &params.sampler)?;
    Ok(serde_json::to_string(&result)?)
}

#[cfg(feature = "python")]
#[pyfunction]
#[pyo3(name = "sample_json")]
fn py_sample_json(params_json: &str) -> PyResult<String> {
    sample_json(params_json)
        .map_err(|e| PyErr::new::<pyo3::exceptions::PyValueError, _>(e.to_string()))
}

/// Placement engine, importable from Python.
#[cfg(feature = "python")]
#[pymodule]
fn free_space_engine(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(py_sample_json, m)?)?;
    Ok(())
}
