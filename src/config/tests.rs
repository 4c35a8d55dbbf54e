//! Unit tests for configuration validation and sink selection.
use super::*;

//==================================================================================VALIDATION
#[test]
/// An enabled channel without a bit rate is rejected with its index.
fn test_zero_nominal_speed_rejected() {
    let config = GatewayConfig::new([
        BusConfig::classic(500_000),
        BusConfig {
            enabled: true,
            ..BusConfig::disabled()
        },
    ]);
    assert_eq!(
        config.validate(),
        Err(ConfigError::ZeroNominalSpeed { channel: 1 })
    );
}

#[test]
/// A disabled channel may leave its bit rate unset.
fn test_disabled_channel_without_speed_is_valid() {
    let config = GatewayConfig::new([BusConfig::classic(250_000), BusConfig::disabled()]);
    assert!(config.validate().is_ok());
}

#[test]
/// Warning and shutdown thresholds must be strictly ordered.
fn test_timeouts_must_be_ordered() {
    let config = GatewayConfig::new([BusConfig::classic(500_000)]).with_timeouts_ms(5_000, 5_000);
    assert_eq!(config.validate(), Err(ConfigError::InvalidTimeouts));
    let config = GatewayConfig::new([BusConfig::classic(500_000)]).with_timeouts_ms(6_000, 5_000);
    assert_eq!(config.validate(), Err(ConfigError::InvalidTimeouts));
}

#[test]
/// A headroom as large as the buffer would never let a frame through.
fn test_sink_limits_must_leave_room() {
    let config = GatewayConfig::new([BusConfig::classic(500_000)]).with_sink_limits(80, 80);
    assert_eq!(config.validate(), Err(ConfigError::InvalidSinkLimits));
}

//==================================================================================BITS_PER_WINDOW
#[test]
/// Window size is a quarter of the nominal speed, defaulting when unset.
fn test_bits_per_window() {
    assert_eq!(BusConfig::classic(500_000).bits_per_window(), 125_000);
    assert_eq!(BusConfig::classic(1_000_000).bits_per_window(), 250_000);
    assert_eq!(BusConfig::disabled().bits_per_window(), DEFAULT_BITS_PER_WINDOW);
    // Below four bit/s the quarter rounds to zero.
    assert_eq!(BusConfig::classic(3).bits_per_window(), DEFAULT_BITS_PER_WINDOW);
}

#[test]
/// The read ceiling is the capacity minus the headroom.
fn test_sink_ceiling() {
    let limits = SinkLimits::default();
    assert_eq!(limits.ceiling(), 2048 - 80);
    assert!(limits.admits(1967));
    assert!(!limits.admits(1968));
}

//==================================================================================OUTPUT_MODE
#[test]
/// Lawicel needs both flags, Wi-Fi beats serial.
fn test_active_sink_priority() {
    let mut mode = OutputMode::default();
    assert_eq!(mode.active_sink(), ActiveSink::Serial);

    mode.wifi_active = true;
    assert_eq!(mode.active_sink(), ActiveSink::Wifi);

    mode.lawicel_mode = true;
    assert_eq!(mode.active_sink(), ActiveSink::Wifi);

    mode.lawicel_enabled = true;
    assert_eq!(mode.active_sink(), ActiveSink::Lawicel);
}

#[test]
/// Shared transceiver boards patch every channel but the first.
fn test_variant_standby_channels() {
    let variant = SystemVariant::SharedTransceiver;
    assert!(!variant.needs_standby_pin(0));
    assert!(variant.needs_standby_pin(1));
    assert!(variant.needs_standby_pin(4));
    assert!(!SystemVariant::Standard.needs_standby_pin(3));
}
