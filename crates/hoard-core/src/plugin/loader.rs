use super::{PluginFactory, PluginInit};
use crate::db::Session;
use crate::hoard::Hoard;
use hoard_common::{Dynamic, Result};
use tracing::{info, instrument};

/// Register `P`'s service, migrate it if it is behind, then initialize `P`
///
/// `parameters` carries answers to a form returned by an earlier
/// [`PluginInit::NeedsInput`]. The caller commits `session` afterwards.
#[instrument(skip_all, fields(plugin = P::NAME))]
pub async fn load_plugin<P: PluginFactory>(
    hoard: &Hoard,
    session: &mut Session,
    parameters: Option<Dynamic>,
) -> Result<PluginInit<P>> {
    let mut core = hoard.plugin_core(session, P::NAME).await?;

    let stored = core.source().version;
    if stored < P::VERSION {
        info!(from = stored, to = P::VERSION, "Updating plugin data");
        P::update(&mut core, session).await?;
        core.set_version(session, P::VERSION).await?;
    }

    let init = P::init(core, session, parameters).await?;
    if let PluginInit::NeedsInput(ref form) = init {
        info!(missing = form.fields.len(), "Plugin needs more configuration");
    }

    Ok(init)
}
