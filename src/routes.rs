use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Route {
    #[default]
    Home,
    About,
    DataframeV1,
    DataframeV2,
    Cleaner,
}

impl Route {
    pub const ALL: [Route; 5] = [
        Route::Home,
        Route::About,
        Route::DataframeV1,
        Route::DataframeV2,
        Route::Cleaner,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::About => "/about",
            Route::DataframeV1 => "/dataframe-v1",
            Route::DataframeV2 => "/dataframe-v2",
            Route::Cleaner => "/cleaner",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Home => "Home",
            Route::About => "About",
            Route::DataframeV1 => "Dataframe V1",
            Route::DataframeV2 => "Dataframe V2",
            Route::Cleaner => "Dataframe Cleaner",
        }
    }

    /// Unknown paths fall back to Home.
    pub fn from_path(path: &str) -> Route {
        let trimmed = path.trim_end_matches('/');
        let path = if trimmed.is_empty() { "/" } else { trimmed };
        Route::ALL
            .into_iter()
            .find(|route| route.path() == path)
            .unwrap_or_default()
    }
}
