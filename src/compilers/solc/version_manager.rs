//! Installs and resolves `solc` versions via `svm`, mirroring the upstream version manager's
//! install-on-demand behavior.

use crate::error::SolcError;
use semver::{Version, VersionReq};

use super::Solc;

/// Returns an installed (or freshly installed, blocking) `solc` satisfying `req`. Installed
/// versions are preferred over a fresh download when one already satisfies the requirement.
pub fn resolve(req: &VersionReq) -> Result<Solc, SolcError> {
    if let Some(version) = Solc::installed_versions().into_iter().filter(|v| req.matches(v)).max() {
        return get_installed(&version);
    }

    let version = best_released_match(req)?;
    install(&version)
}

fn get_installed(version: &Version) -> Result<Solc, SolcError> {
    let home = Solc::svm_home().ok_or(SolcError::NoSvmHomeDir)?;
    let version_str = version.to_string();
    let path = home.join(&version_str).join(format!("solc-{version_str}"));
    if !path.is_file() {
        return Err(SolcError::VersionNotInstalled(version.clone()));
    }
    Ok(Solc::new(path, version.clone()))
}

fn best_released_match(req: &VersionReq) -> Result<Version, SolcError> {
    let releases = svm::all_versions().map_err(|err| SolcError::msg(err.to_string()))?;
    releases.into_iter().filter(|v| req.matches(v)).max().ok_or_else(|| SolcError::VersionNotFound(req.clone()))
}

/// Blocking install through `svm`. `svm`'s own client uses `reqwest::blocking` under the hood,
/// so this is safe to call directly without spinning up a tokio runtime.
fn install(version: &Version) -> Result<Solc, SolcError> {
    let path = svm::blocking_install(version)
        .map_err(|err| crate::error::VersionManagerError::InstallationFailed(version.clone(), err.to_string()))?;
    Ok(Solc::new(path, version.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_not_installed_is_distinct_from_not_found() {
        let err = get_installed(&Version::new(0, 0, 1));
        assert!(matches!(err, Err(SolcError::VersionNotInstalled(_)) | Err(SolcError::NoSvmHomeDir)));
    }
}
