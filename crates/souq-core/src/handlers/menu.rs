use souq_shared::constants::{SETTING_BOT_NAME, SETTING_WELCOME_MESSAGE};
use souq_shared::UserId;

use crate::error::Result;
use crate::payload::{Menu, OutboundPayload, Reply, SettingTopic};
use crate::router::Bot;

const NEWS_ITEMS: [&str; 3] = [
    "📢 A new version of the bot has been released!",
    "🎉 Special offer: double your points today",
    "📱 Electronic payments are now supported",
];

impl Bot {
    pub(crate) async fn start(&self, user_id: UserId) -> Result<Vec<OutboundPayload>> {
        let default_name = self.config.bot_name.as_str();
        let default_message = self.config.welcome_message.as_str();
        let (bot_name, message, admin) = self
            .store
            .read(move |uow| {
                Ok((
                    uow.setting_or(SETTING_BOT_NAME, default_name)?,
                    uow.setting_or(SETTING_WELCOME_MESSAGE, default_message)?,
                    uow.is_admin(user_id)?,
                ))
            })
            .await?;

        Ok(vec![OutboundPayload::new(user_id, Reply::Welcome { bot_name, message })
            .with_menu(Menu::Main { admin })])
    }

    pub(crate) async fn main_menu(&self, user_id: UserId) -> Result<Vec<OutboundPayload>> {
        let menu = self.main_menu_for(user_id).await?;
        Ok(vec![OutboundPayload::new(user_id, Reply::MainMenu).with_menu(menu)])
    }

    pub(crate) async fn help(&self, user_id: UserId) -> Result<Vec<OutboundPayload>> {
        let menu = self.main_menu_for(user_id).await?;
        Ok(vec![OutboundPayload::new(user_id, Reply::Help).with_menu(menu)])
    }

    pub(crate) async fn news(&self, user_id: UserId) -> Result<Vec<OutboundPayload>> {
        let menu = self.main_menu_for(user_id).await?;
        let items = NEWS_ITEMS.iter().map(|s| s.to_string()).collect();
        Ok(vec![OutboundPayload::new(user_id, Reply::News { items }).with_menu(menu)])
    }

    pub(crate) fn settings(&self, user_id: UserId) -> Result<Vec<OutboundPayload>> {
        Ok(vec![OutboundPayload::new(user_id, Reply::Settings).with_menu(Menu::Settings)])
    }

    pub(crate) fn setting_info(&self, user_id: UserId, topic: SettingTopic) -> Result<Vec<OutboundPayload>> {
        Ok(vec![
            OutboundPayload::new(user_id, Reply::SettingInfo { topic }).with_menu(Menu::Settings)
        ])
    }

    /// The router has already dropped any pending session.
    pub(crate) async fn cancel(&self, user_id: UserId) -> Result<Vec<OutboundPayload>> {
        let menu = self.main_menu_for(user_id).await?;
        Ok(vec![OutboundPayload::new(user_id, Reply::Cancelled).with_menu(menu)])
    }
}
