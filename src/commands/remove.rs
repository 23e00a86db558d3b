use crate::api::Mode;
use crate::args::{EntityKind, RemoveArgs};
use crate::commands::{Out, Session};
use crate::model::builtin_templates;
use crate::{Config, Result};
use anyhow::bail;

/// Removes a record by id. An id that does not exist changes nothing. Subscriptions that refer
/// to a removed category, list or payment method keep the id.
pub async fn remove(config: Config, mode: Mode, args: &RemoveArgs) -> Result<Out<()>> {
    let id = args.id();
    let kind = args.entity();
    if kind == EntityKind::Template && builtin_templates().iter().any(|t| t.id == id) {
        bail!("The template '{id}' is bundled with subtrack and cannot be removed");
    }

    let mut session = Session::open(&config, mode).await?;
    let state = &mut session.state;
    let removed = match kind {
        EntityKind::Subscription => state.subscriptions_mut().remove(id)?,
        EntityKind::Category => state.categories_mut().remove(id)?,
        EntityKind::List => state.lists_mut().remove(id)?,
        EntityKind::PaymentMethod => state.payment_methods_mut().remove(id)?,
        EntityKind::Template => state.templates_mut().remove(id)?,
    };
    session.close().await;

    Ok(if removed {
        format!("Removed {kind} {id}").into()
    } else {
        format!("There is no {kind} with id '{id}', nothing was removed").into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::List;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_remove() {
        let env = TestEnv::new().await;
        let mut list = List::new("Family");
        list.id = "l1".to_string();
        env.repository().save_lists(&[list]).unwrap();

        let out = remove(env.config(), Mode::Test, &RemoveArgs::new(EntityKind::List, "l2"))
            .await
            .unwrap();
        assert!(out.message().contains("nothing was removed"));
        assert_eq!(env.repository().lists().len(), 1);

        let out = remove(env.config(), Mode::Test, &RemoveArgs::new(EntityKind::List, "l1"))
            .await
            .unwrap();
        assert_eq!(out.message(), "Removed list l1");
        assert!(env.repository().lists().is_empty());
    }

    #[tokio::test]
    async fn test_builtin_template_cannot_be_removed() {
        let env = TestEnv::new().await;
        let args = RemoveArgs::new(EntityKind::Template, "builtin-netflix");
        assert!(remove(env.config(), Mode::Test, &args).await.is_err());
    }
}
