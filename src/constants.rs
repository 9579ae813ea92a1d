//! Application-wide constants
//!
//! Centralized constants to avoid duplication and ensure consistency.
//! Hardware-specific values are defaults only; each can be overridden from
//! the `[serial]` section of the config file.

// =============================================================================
// Serial
// =============================================================================

/// Default baud rate of the OSD bridge device
pub const DEFAULT_BAUD_RATE: u32 = 921_600;

/// Read timeout while probing a candidate port (milliseconds)
pub const DISCOVERY_READ_TIMEOUT_MS: u64 = 1_000;

/// Time the bridge needs after the port opens (it resets) before it answers
/// IDENTIFY (milliseconds)
pub const DISCOVERY_SETTLE_DELAY_MS: u64 = 3_000;

/// I/O timeout for the dispatch connection (milliseconds)
pub const DISPATCH_IO_TIMEOUT_MS: u64 = 1_000;

// =============================================================================
// Discovery
// =============================================================================

/// Response prefix sent by the bridge firmware in reply to IDENTIFY
///
/// Discovery reads exactly as many bytes as the signature is long.
pub const DEVICE_SIGNATURE: &str = "Fusion ESP";

// =============================================================================
// Display
// =============================================================================

/// Default header in front of the lap time
pub const DEFAULT_LAP_HEADER: &str = "LAP";

/// Default header in front of the time before the first full lap
pub const DEFAULT_HOLESHOT_HEADER: &str = "HS";

/// Default header in front of the previous lap time
pub const DEFAULT_PREVIOUS_LAP_HEADER: &str = "PRV";

/// Default prefix of the rank number in split lines
pub const DEFAULT_POSITION_HEADER: &str = "P";

/// Default time pattern (minutes, 2-digit seconds, 3-digit milliseconds)
pub const DEFAULT_TIME_FORMAT: &str = "{m}:{s}.{d}";

/// Callsigns are clipped to this many characters in split lines
pub const CALLSIGN_CLIP: usize = 10;

/// Default consecutive-lap window for FASTEST_CONSECUTIVE
pub const DEFAULT_CONSECUTIVES_BASE: u32 = 3;

// =============================================================================
// Host option keys
// =============================================================================

/// Option key for the manual serial port override
pub const OPTION_SERIAL_PORT: &str = "osd_serial_port";

/// Option key for the lap header label
pub const OPTION_LAP_HEADER: &str = "osd_lap_header";

/// Option key for the holeshot header label
pub const OPTION_HOLESHOT_HEADER: &str = "osd_holeshot_header";

/// Option key for the previous-lap header label
pub const OPTION_PREVIOUS_LAP_HEADER: &str = "osd_previous_lap_header";

/// Option key for the position header label
pub const OPTION_POSITION_HEADER: &str = "osd_position_header";

/// Option key for the time format pattern
pub const OPTION_TIME_FORMAT: &str = "osd_time_format";

/// Option key for the protocol revision ("standard" or "terminated")
pub const OPTION_REVISION: &str = "osd_revision";

/// Pilot attribute holding the receiver's hex address
pub const ATTR_OSD_ADDRESS: &str = "osd_address";
