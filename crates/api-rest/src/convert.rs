//! Conversions from core types to wire types.

use api_shared::{
    DiskFileRes, FileEntryRes, FolderSummaryRes, StaleFileRes, SummaryRes, VerifyRes,
};
use patchlist_core::constants::LEDGER_DATE_FORMAT;
use patchlist_core::{DriftReport, FileEntry, Summary};

pub fn file_entry(entry: FileEntry) -> FileEntryRes {
    let FileEntry { filename, record } = entry;
    FileEntryRes {
        filename,
        date: record.uploaded_at.format(LEDGER_DATE_FORMAT).to_string(),
        size: record.size,
        sha256: record.digest.to_string(),
        status: record.status.to_string(),
        folder: record.folder.to_string(),
    }
}

pub fn summary(summary: Summary) -> SummaryRes {
    SummaryRes {
        total_files: summary.total_files,
        active_files: summary.active_files,
        inactive_files: summary.inactive_files,
        tracked_bytes: summary.tracked_bytes,
        folders: summary
            .folders
            .into_iter()
            .map(|(folder, s)| {
                (
                    folder.to_string(),
                    FolderSummaryRes {
                        files: s.files,
                        active: s.active,
                        bytes: s.bytes,
                    },
                )
            })
            .collect(),
    }
}

pub fn drift_report(report: DriftReport) -> VerifyRes {
    VerifyRes {
        clean: report.is_clean(),
        untracked: report
            .untracked
            .into_iter()
            .map(|f| DiskFileRes {
                folder: f.folder.to_string(),
                filename: f.filename,
                size: f.size,
            })
            .collect(),
        missing: report.missing,
        stale: report
            .stale
            .into_iter()
            .map(|s| StaleFileRes {
                filename: s.filename,
                folder: s.folder.to_string(),
                recorded_sha256: s.recorded_digest.to_string(),
                actual_sha256: s.actual_digest.to_string(),
                recorded_size: s.recorded_size,
                actual_size: s.actual_size,
            })
            .collect(),
    }
}
