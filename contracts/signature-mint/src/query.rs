use drop_common::{Role, Roles, SignatureVerifier, SignedMintRequest};
use tracing::warn;

use crate::error::ContractError;
use crate::state::SignatureMintConfig;

/// Whether `signed` carries a valid signature from an account holding the
/// minter role. A signature that recovers to nobody is `false`, not an error.
/// A request whose fields do not fit the configured layout is an error.
pub async fn verify(
    verifier: &dyn SignatureVerifier,
    roles: &dyn Roles,
    config: &SignatureMintConfig,
    signed: &SignedMintRequest,
) -> Result<bool, ContractError> {
    let digest = config.digest(&signed.request)?;
    let Some(signer) = verifier.recover(&digest, signed.signature.as_slice()) else {
        warn!(uid = %signed.request.uid, "mint signature does not recover");
        return Ok(false);
    };
    Ok(roles
        .has_role(&config.contract, Role::Minter, &signer)
        .await?)
}
