//! Typed config operations on top of raw field reads and writes
//!
//! Each helper encodes or decodes the field payload with
//! `boardpilot-codec` and turns a `status: false` reply into
//! [`IpcError::DeviceRejected`].

use boardpilot_codec::{
    ConfigField, DEFAULT_REBIND_CAPACITY, DateTimeValue, FieldValue, KeyDef, TrackpadRegisters,
    decode_field_value, decode_key_defs, decode_u8_scalar, encode_key_defs,
};
use tracing::debug;

use crate::client::RpcClient;
use crate::error::{IpcError, IpcResult};
use crate::registry::Device;

/// Fields holding a one-byte pointer sensitivity
pub const SENSITIVITY_FIELDS: [ConfigField; 3] = [
    ConfigField::MouseSensitivity,
    ConfigField::ScrollSensitivity,
    ConfigField::PanSensitivity,
];

fn ensure_sensitivity(field: ConfigField) -> IpcResult<()> {
    if SENSITIVITY_FIELDS.contains(&field) {
        Ok(())
    } else {
        Err(IpcError::InvalidConfig(format!(
            "{field} is not a sensitivity field"
        )))
    }
}

impl RpcClient {
    /// Read a field and return its payload, failing if the device refused
    pub async fn read_field_bytes(&self, device: &Device, field: ConfigField) -> IpcResult<Vec<u8>> {
        let reply = self.read_config(device, field).await?;
        if !reply.status {
            return Err(IpcError::DeviceRejected { field });
        }
        Ok(reply.data)
    }

    /// Write a field payload, failing if the device refused
    pub async fn write_field_bytes(
        &self,
        device: &Device,
        field: ConfigField,
        data: &[u8],
        save: bool,
    ) -> IpcResult<()> {
        let reply = self.write_config(device, field, data, save).await?;
        if !reply.status {
            return Err(IpcError::DeviceRejected { field });
        }
        debug!(serial = %device.serial(), field = %field, len = data.len(), save, "Field written");
        Ok(())
    }

    pub async fn read_field_value(
        &self,
        device: &Device,
        field: ConfigField,
    ) -> IpcResult<FieldValue> {
        let data = self.read_field_bytes(device, field).await?;
        Ok(decode_field_value(field, &data)?)
    }

    pub async fn write_field_value(
        &self,
        device: &Device,
        field: ConfigField,
        value: &FieldValue,
        save: bool,
    ) -> IpcResult<()> {
        let data = value.encode()?;
        self.write_field_bytes(device, field, &data, save).await
    }

    /// Keymap rebinds, empty slots removed
    pub async fn read_keymap(&self, device: &Device) -> IpcResult<Vec<KeyDef>> {
        let data = self.read_field_bytes(device, ConfigField::Keymap).await?;
        Ok(decode_key_defs(&data)?)
    }

    /// Replace the whole rebind table
    pub async fn write_keymap(&self, device: &Device, defs: &[KeyDef], save: bool) -> IpcResult<()> {
        let data = encode_key_defs(defs, DEFAULT_REBIND_CAPACITY)?;
        self.write_field_bytes(device, ConfigField::Keymap, &data, save)
            .await
    }

    pub async fn read_trackpad_registers(&self, device: &Device) -> IpcResult<TrackpadRegisters> {
        let data = self
            .read_field_bytes(device, ConfigField::CustomIqs5xxRegs)
            .await?;
        Ok(TrackpadRegisters::decode(&data)?)
    }

    pub async fn write_trackpad_registers(
        &self,
        device: &Device,
        registers: &TrackpadRegisters,
        save: bool,
    ) -> IpcResult<()> {
        self.write_field_bytes(
            device,
            ConfigField::CustomIqs5xxRegs,
            &registers.encode(),
            save,
        )
        .await
    }

    /// Read a mouse, scroll or pan sensitivity
    pub async fn read_sensitivity(&self, device: &Device, field: ConfigField) -> IpcResult<u8> {
        ensure_sensitivity(field)?;
        let data = self.read_field_bytes(device, field).await?;
        Ok(decode_u8_scalar("Sensitivity", &data)?)
    }

    pub async fn write_sensitivity(
        &self,
        device: &Device,
        field: ConfigField,
        value: u8,
        save: bool,
    ) -> IpcResult<()> {
        ensure_sensitivity(field)?;
        self.write_field_bytes(device, field, &[value], save).await
    }

    /// Set the device clock; the clock is transient and never saved
    pub async fn write_datetime(&self, device: &Device, value: DateTimeValue) -> IpcResult<()> {
        self.write_field_bytes(device, ConfigField::DateTime, &value.encode(), false)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensitivity_fields() {
        assert!(ensure_sensitivity(ConfigField::PanSensitivity).is_ok());
        assert!(matches!(
            ensure_sensitivity(ConfigField::Keymap),
            Err(IpcError::InvalidConfig(_))
        ));
    }
}
