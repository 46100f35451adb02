//! Corrections for devices whose default configuration is known to be wrong.

use unit_bus::{Chain, ControlValue};

/// Override applied to the head of the source chain when its identity
/// starts with `id_prefix`.
#[derive(Clone, Copy, Debug)]
pub struct DeviceQuirk {
    pub id_prefix: &'static str,
    pub control: &'static str,
    pub value: i64,
}

/// dc1394 (FireWire) cameras come up with a packet size that drops frames.
pub const DEVICE_QUIRKS: &[DeviceQuirk] = &[DeviceQuirk {
    id_prefix: "input.dc1394",
    control: "packet-size",
    value: 1000,
}];

pub fn matching<'a>(
    table: &'a [DeviceQuirk],
    identity: &'a str,
) -> impl Iterator<Item = &'a DeviceQuirk> {
    table.iter().filter(move |q| identity.starts_with(q.id_prefix))
}

/// Apply every matching quirk to the first unit of the chain. Returns the
/// number applied; a quirk the unit rejects is logged and skipped.
pub fn apply_device_quirks(chain: &mut Chain, table: &[DeviceQuirk]) -> usize {
    let Some(&head) = chain.units().first() else {
        return 0;
    };
    let Some(identity) = chain.unit_identity(head).map(str::to_string) else {
        return 0;
    };

    let mut applied = 0;
    for quirk in matching(table, &identity) {
        match chain.set_control(head, quirk.control, ControlValue::Int(quirk.value)) {
            Ok(()) => {
                log::info!(
                    "{}: forcing {} = {}",
                    identity,
                    quirk.control,
                    quirk.value
                );
                applied += 1;
            }
            Err(e) => log::warn!("{}: could not apply quirk: {}", identity, e),
        }
    }
    applied
}
