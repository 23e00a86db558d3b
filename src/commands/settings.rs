use crate::api::Mode;
use crate::args::SettingsArgs;
use crate::commands::{read_state, Out, Session};
use crate::model::{currency_code, Settings};
use crate::{Config, Result};

/// Applies the settings given in `args` and returns the resulting settings. With no settings
/// given, nothing is written.
pub async fn settings(config: Config, mode: Mode, args: &SettingsArgs) -> Result<Out<Settings>> {
    if args.is_empty() {
        let current = read_state(&config)?.settings().get().clone();
        return Ok(Out::new("No settings were changed", current));
    }

    let main_currency = args.main_currency().map(currency_code).transpose()?;
    let mut session = Session::open(&config, mode).await?;
    let store = session.state.settings_mut();
    let result = store.update(|s| {
        if let Some(code) = main_currency {
            s.main_currency = code;
        }
        if let Some(value) = args.round_whole_numbers() {
            s.round_whole_numbers = value;
        }
        if let Some(value) = args.true_dark_colors() {
            s.true_dark_colors = value;
        }
        if let Some(value) = args.haptics_enabled() {
            s.haptics_enabled = value;
        }
        if let Some(value) = args.premium() {
            s.premium = value;
        }
    });
    let updated = store.get().clone();
    session.finish(result).await?;
    Ok(Out::new("Updated settings", updated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_settings() {
        let env = TestEnv::new().await;
        let args = SettingsArgs::default()
            .with_main_currency("gbp")
            .with_premium(true);
        let out = settings(env.config(), Mode::Test, &args).await.unwrap();
        let updated = out.structure().unwrap();
        assert_eq!(updated.main_currency, "GBP");
        assert!(updated.premium);
        assert_eq!(&env.repository().settings(), updated);

        let out = settings(env.config(), Mode::Test, &SettingsArgs::default())
            .await
            .unwrap();
        assert_eq!(out.structure(), Some(updated));
    }

    #[tokio::test]
    async fn test_settings_upload_together() {
        let env = TestEnv::new().await;
        let args = SettingsArgs::default()
            .with_main_currency("eur")
            .with_round_whole_numbers(true)
            .with_premium(true);
        settings(env.config(), Mode::Test, &args).await.unwrap();

        let backup = env
            .home()
            .join(".test-remote")
            .join("Backups")
            .join("subtrack-backup.json");
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(backup).unwrap()).unwrap();
        assert_eq!(json["settings"]["mainCurrency"], "EUR");
        assert_eq!(json["settings"]["roundWholeNumbers"], true);
        assert_eq!(json["settings"]["premium"], true);
    }

    #[tokio::test]
    async fn test_invalid_currency() {
        let env = TestEnv::new().await;
        let args = SettingsArgs::default()
            .with_premium(true)
            .with_main_currency("pounds");
        assert!(settings(env.config(), Mode::Test, &args).await.is_err());
        assert!(env.repository().stored_settings().is_none());
    }
}
