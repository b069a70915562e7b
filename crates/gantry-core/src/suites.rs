//! Builtin command maps for the categorized test suites.
//!
//! These are the declarative job definitions the CLI subcommands expand
//! over the selected platforms: documentation build, linting (flake8,
//! pydocstyle) and unit tests, parameterized by python version.

use crate::command_map::CommandMap;
use crate::error::Result;
use crate::platform::PyVersion;

/// Documentation build. Python 3 only, so not parameterized.
pub fn docs() -> Vec<CommandMap> {
    vec![CommandMap::new("docs", "./ci/build-docs.sh")]
}

/// flake8 lint, one map per selected python version.
pub fn flake8(pyvers: &[PyVersion]) -> Result<Vec<CommandMap>> {
    pyvers
        .iter()
        .map(|py| module_map(*py, "flake8", &[]))
        .collect()
}

/// pydocstyle lint, one map per selected python version.
pub fn pydocstyle(pyvers: &[PyVersion]) -> Result<Vec<CommandMap>> {
    pyvers
        .iter()
        .map(|py| module_map(*py, "pydocstyle", &[]))
        .collect()
}

/// Unit tests, one map per selected python version. `failfast` is passed
/// through to the in-container test runner.
pub fn unit(pyvers: &[PyVersion], failfast: bool) -> Result<Vec<CommandMap>> {
    let extra: &[&str] = if failfast { &["-x"] } else { &[] };
    pyvers
        .iter()
        .map(|py| module_map(*py, "pytest", extra).map(relabel_unit))
        .collect()
}

/// Every suite: docs, both lints, unit tests.
pub fn all(pyvers: &[PyVersion], failfast: bool) -> Result<Vec<CommandMap>> {
    let mut maps = docs();
    maps.extend(flake8(pyvers)?);
    maps.extend(pydocstyle(pyvers)?);
    maps.extend(unit(pyvers, failfast)?);
    Ok(maps)
}

/// A `python -m <module>` map labeled `<py>-<module>`.
///
/// centos7 ships its python3 as `python3.6`, so python 3 maps carry an
/// interpreter-path override there.
fn module_map(py: PyVersion, module: &str, extra: &[&str]) -> Result<CommandMap> {
    let argv = module_argv(py.interpreter(), module, extra);
    let map = CommandMap::new(format!("{}-{}", py.tag(), module), argv);
    match py {
        PyVersion::Py3 => map.with_override("centos7", module_argv("python3.6", module, extra)),
        PyVersion::Py2 => Ok(map),
    }
}

fn module_argv<'a>(interpreter: &'a str, module: &'a str, extra: &[&'a str]) -> Vec<&'a str> {
    let mut argv = vec![interpreter, "-m", module];
    argv.extend_from_slice(extra);
    argv
}

fn relabel_unit(mut map: CommandMap) -> CommandMap {
    map.label = map.label.replace("pytest", "unit");
    map
}
