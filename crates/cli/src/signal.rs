// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Interrupt handling for long runs

use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Cancel `cancellation_token` on SIGINT (Ctrl+C) or SIGTERM
///
/// A run cancelled this way stops scheduling new trials and still writes the
/// records it already has. Returns early if the token is cancelled elsewhere.
pub async fn cancel_on_signal(cancellation_token: CancellationToken) {
    let signal_received = async {
        #[cfg(unix)]
        #[allow(clippy::expect_used)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let mut sigterm =
                signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");
            let mut sigint =
                signal(SignalKind::interrupt()).expect("Failed to register SIGINT handler");

            tokio::select! {
                _ = sigterm.recv() => "SIGTERM",
                _ = sigint.recv() => "SIGINT",
            }
        }

        #[cfg(not(unix))]
        #[allow(clippy::expect_used)]
        {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install CTRL+C signal handler");
            "CTRL+C"
        }
    };

    tokio::select! {
        signal_name = signal_received => {
            warn!(signal = signal_name, "Interrupted, finishing in-flight trials and saving partial results");
            cancellation_token.cancel();
        },
        () = cancellation_token.cancelled() => {}
    }
}
