//! CSV tab: payment-app exports from Venmo and Zelle

use ticket_verifier_api::{ApiError, ApiResponse, CsvImport, UploadFile, UploadStatus};
use ticket_verifier_core::{Effects, effect::Effect, smallvec};

use super::{DashboardAction, DashboardReducer, DashboardState, Notice};
use crate::environment::ConsoleEnvironment;
use crate::query::{Mutation, invalidated_by};

impl DashboardReducer {
    pub(super) fn select_csv(state: &mut DashboardState, files: Vec<UploadFile>) {
        let mut files = files.into_iter();
        match (files.next(), files.next()) {
            (Some(file), None) if file.extension().as_deref() == Some("csv") => {
                state.csv_file = Some(file);
            }
            (Some(_), None) => {
                state.csv_file = None;
                state.notice = Some(Notice::Error("Please select a CSV file.".into()));
            }
            (Some(_), Some(_)) => {
                state.csv_file = None;
                state.notice = Some(Notice::Error("Please select a single CSV file.".into()));
            }
            (None, _) => state.csv_file = None,
        }
    }

    pub(super) fn upload_csv(
        state: &mut DashboardState,
        env: &ConsoleEnvironment,
    ) -> Effects<DashboardAction> {
        if state.csv_uploading {
            return Effects::new();
        }
        let Some(file) = state.csv_file.clone() else {
            state.notice = Some(Notice::Error("Please select a CSV file to upload.".into()));
            return Effects::new();
        };

        state.csv_uploading = true;
        let api = env.api.clone();
        smallvec![Effect::future(async move {
            Some(DashboardAction::CsvUploaded(api.upload_csv(file).await))
        })]
    }

    pub(super) fn csv_uploaded(
        state: &mut DashboardState,
        env: &ConsoleEnvironment,
        result: Result<ApiResponse<CsvImport>, ApiError>,
    ) -> Effects<DashboardAction> {
        state.csv_uploading = false;
        match result {
            Ok(response) => {
                state.csv_file = None;
                state.notice = Some(upload_notice(&response));
                smallvec![Self::refetch(invalidated_by(Mutation::UploadCsv), state, env)]
            }
            Err(e) => {
                tracing::warn!(error = %e, "CSV upload failed");
                state.notice = Some(Notice::Error(Self::failure_message(
                    Mutation::UploadCsv.failure_prefix(),
                    &e,
                )));
                Effects::new()
            }
        }
    }
}

/// Success for a clean import, a warning for `partial` or `error`
fn upload_notice(response: &ApiResponse<CsvImport>) -> Notice {
    let message = response
        .message
        .clone()
        .unwrap_or_else(|| Mutation::UploadCsv.success_message().to_string());

    let Some(upload) = response.data.as_ref() else {
        return Notice::Success(message);
    };
    let counts = format!(
        "{} processed, {} new, {} updated",
        upload.records_processed, upload.new_records, upload.updated_records
    );
    match upload.outcome() {
        UploadStatus::Success => Notice::Success(format!("{message} ({counts})")),
        UploadStatus::Partial => {
            tracing::warn!(file = %upload.original_filename, "CSV import partially applied");
            Notice::Warning(format!(
                "{} was only partially imported ({counts}). Check the file and upload history.",
                upload.original_filename
            ))
        }
        UploadStatus::Error => {
            tracing::warn!(file = %upload.original_filename, "CSV import reported an error");
            Notice::Warning(format!(
                "{} was uploaded but the import reported an error ({counts}).",
                upload.original_filename
            ))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::harness;
    use ticket_verifier_testing::effects::settle;
    use ticket_verifier_testing::reducer_test::assertions;
    use ticket_verifier_api::UploadType;
    use ticket_verifier_testing::{ApiCall, MockApi, ReducerTest};

    fn csv(name: &str) -> UploadFile {
        UploadFile::new(name, "text/csv", b"id,amount\n1,14.00\n2,28.00\n".to_vec())
    }

    #[test]
    fn upload_without_file_issues_no_request() {
        let h = harness(MockApi::new().authenticated());
        let api = h.api.clone();
        ReducerTest::new(DashboardReducer::new())
            .with_env(h.env)
            .given_state(DashboardState::default())
            .when_action(DashboardAction::UploadCsv)
            .then_state(|state| {
                assert_eq!(
                    state.notice,
                    Some(Notice::Error("Please select a CSV file to upload.".to_string()))
                );
            })
            .then_effects(assertions::assert_no_effects)
            .run();
        assert!(api.calls().is_empty());
    }

    #[test]
    fn only_a_single_csv_is_accepted() {
        let mut state = DashboardState::default();

        DashboardReducer::select_csv(&mut state, vec![csv("a.csv"), csv("b.csv")]);
        assert!(state.csv_file.is_none());

        DashboardReducer::select_csv(&mut state, vec![csv("venmo.xlsx")]);
        assert!(state.csv_file.is_none());

        DashboardReducer::select_csv(&mut state, vec![csv("Venmo.CSV")]);
        assert_eq!(state.csv_file.as_ref().unwrap().file_name, "Venmo.CSV");
    }

    #[tokio::test]
    async fn upload_refreshes_history_and_analytics() {
        let h = harness(MockApi::new().authenticated());
        let mut state = DashboardState {
            csv_file: Some(csv("venmo_march.csv")),
            ..DashboardState::default()
        };

        settle(&DashboardReducer, &mut state, &h.env, DashboardAction::UploadCsv).await;

        assert_eq!(
            h.api.calls(),
            vec![
                ApiCall::UploadCsv("venmo_march.csv".to_string()),
                ApiCall::CsvUploads,
                ApiCall::Analytics,
            ]
        );
        assert!(state.csv_file.is_none());
        assert!(!state.csv_uploading);
        assert_eq!(state.csv_uploads.data().unwrap().len(), 1);
        assert!(matches!(state.notice, Some(Notice::Success(_))));
    }

    #[test]
    fn clean_import_reports_counts_and_refreshes() {
        let h = harness(MockApi::new().authenticated());
        let response = ApiResponse {
            success: true,
            data: Some(CsvImport {
                filename: "20240602_120000_venmo.csv".to_string(),
                original_filename: "venmo.csv".to_string(),
                upload_type: UploadType::Venmo,
                records_processed: 40,
                new_records: 35,
                updated_records: 5,
                status: None,
            }),
            message: Some("Successfully uploaded venmo CSV: venmo.csv.".to_string()),
            error: None,
        };

        ReducerTest::new(DashboardReducer::new())
            .with_env(h.env)
            .given_state(DashboardState {
                csv_file: Some(csv("venmo.csv")),
                csv_uploading: true,
                ..DashboardState::default()
            })
            .when_action(DashboardAction::CsvUploaded(Ok(response)))
            .then_state(|state| {
                assert_eq!(
                    state.notice,
                    Some(Notice::Success(
                        "Successfully uploaded venmo CSV: venmo.csv. \
                         (40 processed, 35 new, 5 updated)"
                            .to_string()
                    ))
                );
                assert!(state.csv_file.is_none());
                assert!(state.csv_uploads.is_loading());
            })
            // History and analytics
            .then_effects(|effects| assertions::assert_requests(effects, 2))
            .run();
    }

    #[tokio::test]
    async fn partial_import_is_a_warning() {
        let h = harness(MockApi::new().authenticated());
        h.api.set_next_upload_status(UploadStatus::Partial);
        let mut state = DashboardState {
            csv_file: Some(csv("zelle.csv")),
            ..DashboardState::default()
        };

        settle(&DashboardReducer, &mut state, &h.env, DashboardAction::UploadCsv).await;

        match &state.notice {
            Some(Notice::Warning(message)) => assert!(message.contains("partially imported")),
            other => unreachable!("expected a warning, got {other:?}"),
        }
        assert!(state.csv_uploads.data().unwrap()[0].needs_attention());
    }

    #[tokio::test]
    async fn failed_upload_keeps_the_file() {
        let h = harness(MockApi::new().authenticated());
        h.api.fail_next(
            |c| matches!(c, ApiCall::UploadCsv(_)),
            ApiError::Rejected("Unrecognised CSV format".to_string()),
        );
        let mut state = DashboardState {
            csv_file: Some(csv("bank.csv")),
            ..DashboardState::default()
        };

        settle(&DashboardReducer, &mut state, &h.env, DashboardAction::UploadCsv).await;

        assert_eq!(
            state.notice,
            Some(Notice::Error(
                "Error uploading CSV: Unrecognised CSV format".to_string()
            ))
        );
        assert!(state.csv_file.is_some());
    }
}
