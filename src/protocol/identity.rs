//! Panel identity (spec §3 "Panel identity"): the stable set reported to
//! the controller during the handshake (§4.3, `0x0097`).

/// Which of the two device records the handshake is reporting. The panel
/// is always object id 0; a synthetic "kernel" record is always object id
/// 2 (§3: "Two device records are reported to the controller").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceObject {
    Panel,
    Kernel,
}

impl DeviceObject {
    pub fn object_id(self) -> u16 {
        match self {
            DeviceObject::Panel => 0,
            DeviceObject::Kernel => 2,
        }
    }
}

/// The panel's stable identity. `serial` is always exactly 16 bytes,
/// space-padded (§3 invariant).
#[derive(Debug, Clone)]
pub struct PanelIdentity {
    pub device_id: u16,
    pub parent_id: u16,
    pub manufacturer_id: u32,
    serial: [u8; 16],
    pub firmware_id: u16,
    pub version: String,
    pub device_name: String,
    pub manufacturer_name: String,
    pub ipv4: [u8; 4],
    /// Carried over from `tconfig.h`'s `getUUID()` (SPEC_FULL §E.1); used
    /// only to populate free-text identity fields, not part of any §3
    /// invariant.
    pub uuid: String,
}

impl PanelIdentity {
    pub fn new(device_id: u16, manufacturer_id: u32, firmware_id: u16, device_name: impl Into<String>) -> Self {
        PanelIdentity {
            device_id,
            parent_id: 0,
            manufacturer_id,
            serial: [b' '; 16],
            firmware_id,
            version: "1.0.0".to_string(),
            device_name: device_name.into(),
            manufacturer_name: "AMX".to_string(),
            ipv4: [0, 0, 0, 0],
            uuid: String::new(),
        }
    }

    /// Set the 16-byte serial, space-padding or truncating as needed to
    /// uphold the §3 invariant ("serial is exactly 16 bytes, space-padded").
    pub fn set_serial(&mut self, serial: &str) {
        let bytes = serial.as_bytes();
        let mut buf = [b' '; 16];
        let n = bytes.len().min(16);
        buf[..n].copy_from_slice(&bytes[..n]);
        self.serial = buf;
    }

    pub fn serial(&self) -> [u8; 16] {
        self.serial
    }

    /// Build the corresponding kernel device record. The kernel record
    /// shares the panel's network identity but reports object id 2 and a
    /// fixed kernel firmware tag.
    pub fn kernel_record(&self) -> PanelIdentity {
        let mut kernel = self.clone();
        kernel.device_name = format!("{} Kernel", self.device_name);
        kernel
    }

    /// Encode the device-info record sent on `0x0097` (§4.3, handshake and
    /// identification). Layout follows the reference `DEVICE_INFO` struct:
    /// object id, parent id, manufacturer id, device id, 16-byte serial,
    /// firmware id, then three NUL-padded free-text fields.
    pub fn encode(&self, object: DeviceObject) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + 4 + 2 + 16 + 2 + 16 + 32 + 32 + 36 + 2);
        out.push(object.object_id() as u8);
        out.push(self.parent_id as u8);
        out.extend_from_slice(&(self.manufacturer_id as u16).to_be_bytes());
        out.extend_from_slice(&self.device_id.to_be_bytes());
        out.extend_from_slice(&self.serial);
        out.extend_from_slice(&self.firmware_id.to_be_bytes());
        push_nul_padded(&mut out, &self.version, 16);
        push_nul_padded(&mut out, &self.device_name, 32);
        push_nul_padded(&mut out, &self.manufacturer_name, 32);
        push_nul_padded(&mut out, &self.uuid, 36);
        out.push(0); // format: no extended addressing
        out.push(0); // len: no extended address bytes follow
        out
    }
}

fn push_nul_padded(out: &mut Vec<u8>, s: &str, width: usize) {
    let bytes = s.as_bytes();
    let n = bytes.len().min(width.saturating_sub(1));
    out.extend_from_slice(&bytes[..n]);
    out.resize(out.len() + (width - n), 0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_is_space_padded_to_16() {
        let mut id = PanelIdentity::new(0x0149, 1, 4, "G5 Panel");
        id.set_serial("ABC123XYZ00000");
        assert_eq!(id.serial().len(), 16);
        assert_eq!(&id.serial()[..14], b"ABC123XYZ00000");
        assert_eq!(&id.serial()[14..], b"  ");
    }

    #[test]
    fn encode_has_serial_at_fixed_offset() {
        let mut id = PanelIdentity::new(0x0149, 1, 4, "G5 Panel");
        id.set_serial("ABC123XYZ00000");
        let enc = id.encode(DeviceObject::Panel);
        assert_eq!(enc[0], 0); // object id
        assert_eq!(u16::from_be_bytes([enc[2], enc[3]]), 1); // manufacturer id
        assert_eq!(u16::from_be_bytes([enc[4], enc[5]]), 0x0149); // device id
        assert_eq!(&enc[6..22], &id.serial());
    }

    #[test]
    fn encode_carries_the_uuid_in_its_free_text_tail() {
        let mut id = PanelIdentity::new(0x0149, 1, 4, "G5 Panel");
        id.uuid = "3fa1c2d4-uuid".to_string();
        let enc = id.encode(DeviceObject::Panel);
        let tail = &enc[enc.len() - 2 - 36..enc.len() - 2];
        assert!(tail.starts_with(id.uuid.as_bytes()));
    }

    #[test]
    fn serial_truncates_when_too_long() {
        let mut id = PanelIdentity::new(1, 1, 1, "x");
        id.set_serial("0123456789ABCDEFGHIJ");
        assert_eq!(id.serial().len(), 16);
        assert_eq!(&id.serial(), b"0123456789ABCDEF");
    }
}
