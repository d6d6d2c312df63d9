//! Legacy record totals, for sizing a run before starting it.

use std::collections::BTreeMap;

use nutrilog_core::{EntityKind, LegacyConfig, Tuning};
use nutrilog_legacy::{LegacyClient, LegacySource};

pub(crate) async fn run(json: bool) -> anyhow::Result<()> {
    let legacy = LegacyConfig::from_env()?;
    let tuning = Tuning::from_env()?;
    let client = LegacyClient::new(&legacy, tuning.timeout)?;

    let mut counts = BTreeMap::new();
    for kind in EntityKind::ALL {
        counts.insert(kind.stage_name(), client.count(kind).await?);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&counts)?);
        return Ok(());
    }
    for kind in EntityKind::ALL {
        let total = counts.get(kind.stage_name()).copied().unwrap_or_default();
        let capped = if total > tuning.fetch_limit { "  (exceeds fetch limit)" } else { "" };
        println!("{:<9} {total}{capped}", kind.stage_name());
    }
    Ok(())
}
