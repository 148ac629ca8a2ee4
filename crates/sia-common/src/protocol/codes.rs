//! Event code tables
//!
//! The SIA table covers the 2-letter codes panels commonly report; the
//! Contact ID table covers the 3-digit event numbers tunneled in ADM-CID
//! frames. A code missing from its table is answered with DUH: the frame
//! parsed, but the receiver cannot act on it.

/// Look up the description of a SIA 2-letter event code.
pub fn sia_code_description(code: &str) -> Option<&'static str> {
    let desc = match code {
        "AR" => "AC Restoral",
        "AT" => "AC Trouble",
        "BA" => "Burglary Alarm",
        "BB" => "Burglary Bypass",
        "BC" => "Burglary Cancel",
        "BH" => "Burglary Alarm Restore",
        "BJ" => "Burglary Trouble Restore",
        "BR" => "Burglary Restoral",
        "BT" => "Burglary Trouble",
        "BU" => "Burglary Unbypass",
        "BV" => "Burglary Verified",
        "BX" => "Burglary Test",
        "CA" => "Automatic Closing",
        "CF" => "Forced Closing",
        "CG" => "Close Area",
        "CL" => "Closing Report",
        "CP" => "Automatic Closing",
        "CQ" => "Remote Closing",
        "DG" => "Access Granted",
        "DD" => "Access Denied",
        "EA" => "Exit Alarm",
        "FA" => "Fire Alarm",
        "FH" => "Fire Alarm Restore",
        "FJ" => "Fire Trouble Restore",
        "FR" => "Fire Restoral",
        "FT" => "Fire Trouble",
        "GA" => "Gas Alarm",
        "GH" => "Gas Alarm Restore",
        "GJ" => "Gas Trouble Restore",
        "GR" => "Gas Restoral",
        "GT" => "Gas Trouble",
        "HA" => "Holdup Alarm",
        "HH" => "Holdup Alarm Restore",
        "HR" => "Holdup Restoral",
        "JL" => "Log Threshold",
        "JP" => "User On Premises",
        "KA" => "Heat Alarm",
        "KH" => "Heat Alarm Restore",
        "KR" => "Heat Restoral",
        "LB" => "Local Program",
        "LR" => "Phone Line Restoral",
        "LT" => "Phone Line Trouble",
        "MA" => "Medical Alarm",
        "MH" => "Medical Alarm Restore",
        "MR" => "Medical Restoral",
        "NL" => "Network Link Test",
        "OA" => "Automatic Opening",
        "OG" => "Open Area",
        "OP" => "Opening Report",
        "OQ" => "Remote Opening",
        "OR" => "Disarm From Alarm",
        "PA" => "Panic Alarm",
        "PH" => "Panic Alarm Restore",
        "PR" => "Panic Restoral",
        "QA" => "Emergency Alarm",
        "QR" => "Emergency Restoral",
        "RB" => "Remote Program Begin",
        "RP" => "Automatic Test",
        "RR" => "Power Up",
        "RS" => "Remote Program Success",
        "RX" => "Manual Test",
        "TA" => "Tamper Alarm",
        "TR" => "Tamper Restoral",
        "UA" => "Untyped Zone Alarm",
        "UR" => "Untyped Zone Restoral",
        "UT" => "Untyped Zone Trouble",
        "WA" => "Water Alarm",
        "WH" => "Water Alarm Restore",
        "WR" => "Water Restoral",
        "XT" => "Transmitter Battery Trouble",
        "XR" => "Transmitter Battery Restoral",
        "YA" => "Bell Fault",
        "YH" => "Bell Restored",
        "YT" => "System Battery Trouble",
        "YR" => "System Battery Restoral",
        "ZA" => "Freeze Alarm",
        "ZR" => "Freeze Restoral",
        _ => return None,
    };
    Some(desc)
}

/// Look up the description of a Contact ID event number.
pub fn contact_id_description(event_type: u16) -> Option<&'static str> {
    let desc = match event_type {
        100 => "Medical",
        110 => "Fire Alarm",
        111 => "Smoke",
        114 => "Heat",
        120 => "Panic Alarm",
        121 => "Duress",
        122 => "Silent Panic",
        123 => "Audible Panic",
        130 => "Burglary",
        131 => "Perimeter",
        132 => "Interior",
        133 => "24 Hour Burglary",
        134 => "Entry/Exit",
        135 => "Day/Night",
        136 => "Outdoor",
        137 => "Tamper",
        139 => "Intrusion Verifier",
        140 => "General Alarm",
        144 => "Sensor Tamper",
        150 => "24 Hour Non-Burglary",
        151 => "Gas Detected",
        154 => "Water Leakage",
        158 => "High Temperature",
        159 => "Low Temperature",
        301 => "AC Loss",
        302 => "Low System Battery",
        305 => "System Reset",
        350 => "Communication Trouble",
        354 => "Failure To Communicate",
        373 => "Fire Trouble",
        381 => "Loss Of Supervision RF",
        383 => "Sensor Tamper",
        384 => "RF Low Battery",
        401 => "Open/Close By User",
        403 => "Automatic Open/Close",
        406 => "Cancel",
        407 => "Remote Arm/Disarm",
        441 => "Armed Stay",
        459 => "Recent Close",
        570 => "Zone Bypass",
        601 => "Manual Test",
        602 => "Periodic Test",
        616 => "Service Request",
        621 => "Event Log Reset",
        625 => "Time/Date Reset",
        _ => return None,
    };
    Some(desc)
}

/// Contact ID event qualifiers: 1 = new event, 3 = restore, 6 = repeat.
pub fn valid_contact_id_qualifier(qualifier: u8) -> bool {
    matches!(qualifier, 1 | 3 | 6)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sia_codes() {
        assert_eq!(sia_code_description("BA"), Some("Burglary Alarm"));
        assert_eq!(sia_code_description("RP"), Some("Automatic Test"));
        assert_eq!(sia_code_description("ZZ"), None);
    }

    #[test]
    fn test_contact_id_codes() {
        assert_eq!(contact_id_description(130), Some("Burglary"));
        assert_eq!(contact_id_description(602), Some("Periodic Test"));
        assert_eq!(contact_id_description(999), None);
    }

    #[test]
    fn test_contact_id_qualifiers() {
        assert!(valid_contact_id_qualifier(1));
        assert!(valid_contact_id_qualifier(3));
        assert!(valid_contact_id_qualifier(6));
        assert!(!valid_contact_id_qualifier(2));
        assert!(!valid_contact_id_qualifier(0));
    }
}
