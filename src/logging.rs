/* stilgar-firebase - Rudderstack events to Firebase Analytics calls
 * Copyright (C) 2023 Withings
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published
 * by the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>. */

use crate::config;

use flexi_logger::{DeferredNow, LogSpecification, Logger, LoggerHandle};
use flexi_logger::writers::{SyslogWriter, SyslogConnection, SyslogLineHeader, SyslogFacility};
use serde::{de, Deserialize};

/// Starts the logger as per the logging block, keep the handle around
pub fn init_logger(log_config: &config::Logging) -> Result<LoggerHandle, String> {
    let mut spec = LogSpecification::builder();
    spec.module("stilgar_firebase", log_config.level);
    let logger = Logger::with(spec.build());

    let logger = match &log_config.syslog {
        Some(syslog_config) => {
            let addr = (syslog_config.host.clone(), syslog_config.port);
            let connection = match syslog_config.protocol.as_str() {
                "tcp" => SyslogConnection::try_tcp(addr),
                "udp" => SyslogConnection::try_udp(("0.0.0.0".into(), 0), addr),
                other => return Err(format!("unknown syslog protocol: {}", other)),
            }.map_err(|e| format!("failed to create a connection to syslog: {}", e))?;

            let writer = SyslogWriter::builder(
                connection,
                SyslogLineHeader::Rfc3164,
                syslog_config.facility
            )
                .format(record_formatter)
                .build()
                .map_err(|e| format!("failed to build syslog writer: {}", e))?;

            logger.log_to_writer(writer)
        },
        /* stdout carries the Firebase calls */
        None => logger.log_to_stderr().format(record_formatter)
    };

    logger.start().map_err(|e| format!("failed to start logger: {}", e))
}

/// Formats a record, with its message id when there is one
fn record_formatter(
    writer: &mut dyn std::io::Write,
    now: &mut DeferredNow,
    record: &log::Record) -> Result<(), std::io::Error> {
    writeln!(
        writer,
        "{} {} [{}]{} {}",
        now.format_rfc3339(),
        record.level(),
        record.module_path().unwrap_or("stilgar_firebase::<unknown>"),
        record.key_values().get("mid".into()).map(|i| format!(" [{}]", i)).unwrap_or("".into()),
        record.args(),
    )
}

/// Syslog facilities, by their syslog.conf names
const FACILITIES: [(&str, SyslogFacility); 24] = [
    ("kern", SyslogFacility::Kernel),
    ("user", SyslogFacility::UserLevel),
    ("mail", SyslogFacility::MailSystem),
    ("daemon", SyslogFacility::SystemDaemons),
    ("auth", SyslogFacility::Authorization),
    ("syslog", SyslogFacility::SyslogD),
    ("lpr", SyslogFacility::LinePrinter),
    ("news", SyslogFacility::News),
    ("uucp", SyslogFacility::Uucp),
    ("cron", SyslogFacility::Clock),
    ("authpriv", SyslogFacility::Authorization2),
    ("ftp", SyslogFacility::Ftp),
    ("ntp", SyslogFacility::Ntp),
    ("security", SyslogFacility::LogAudit),
    ("console", SyslogFacility::LogAlert),
    ("solaris-cron", SyslogFacility::Clock2),
    ("local0", SyslogFacility::LocalUse0),
    ("local1", SyslogFacility::LocalUse1),
    ("local2", SyslogFacility::LocalUse2),
    ("local3", SyslogFacility::LocalUse3),
    ("local4", SyslogFacility::LocalUse4),
    ("local5", SyslogFacility::LocalUse5),
    ("local6", SyslogFacility::LocalUse6),
    ("local7", SyslogFacility::LocalUse7),
];

/// Deserialises a syslog facility from its name
pub fn parse_facility<'de, D>(deserializer: D) -> Result<SyslogFacility, D::Error>
where
    D: de::Deserializer<'de>,
{
    let name = String::deserialize(deserializer)?;
    FACILITIES.iter()
        .find(|(n, _)| *n == name)
        .map(|(_, facility)| *facility)
        .ok_or_else(|| de::Error::custom(format!("unknown syslog facility: {}", name)))
}
