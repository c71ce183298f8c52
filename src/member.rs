//! Member profiles

use crate::client::{ForumClient, MethodCall};
use crate::error::{ForumError, Result};
use crate::lenient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A forum member.
///
/// `fetched` is true for a full profile from [`ForumClient::get_member`];
/// members embedded in other records only carry a few fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Member {
    pub id: u64,
    pub username: String,
    pub title: String,
    pub avatar_url: String,
    pub profile_pic_url: String,
    pub profile_url: String,
    pub signature: String,
    pub birthday: String,
    pub display_email: String,
    pub homepage: String,
    pub join_date: Option<DateTime<Utc>>,
    pub last_activity: Option<DateTime<Utc>>,
    pub posts: u64,
    pub age: u64,
    pub note_count: u64,
    pub can_be_friend: bool,
    pub has_im_details: bool,
    pub online: bool,
    pub fetched: bool,
}

#[derive(Debug, Default, Deserialize)]
struct RawMember {
    #[serde(default, deserialize_with = "lenient::int")]
    userid: u64,
    #[serde(default, deserialize_with = "lenient::text")]
    username: String,
    #[serde(default, deserialize_with = "lenient::text")]
    usertitle: String,
    #[serde(default, deserialize_with = "lenient::text")]
    avatarurl: String,
    #[serde(default, deserialize_with = "lenient::text")]
    profilepicurl: String,
    #[serde(default, deserialize_with = "lenient::text")]
    profileurl: String,
    #[serde(default, deserialize_with = "lenient::text")]
    signature: String,
    #[serde(default, deserialize_with = "lenient::text")]
    birthday: String,
    #[serde(default, deserialize_with = "lenient::text")]
    displayemail: String,
    #[serde(default, deserialize_with = "lenient::text")]
    homepage: String,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    joindate: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    lastactivitytime: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::int")]
    posts: u64,
    #[serde(default, deserialize_with = "lenient::int")]
    age: u64,
    #[serde(default, deserialize_with = "lenient::int")]
    usernotecount: u64,
    #[serde(default, deserialize_with = "lenient::flag")]
    canbefriend: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    hasimdetails: bool,
    #[serde(default)]
    onlinestatus: Value,
}

impl From<RawMember> for Member {
    fn from(raw: RawMember) -> Self {
        Self {
            id: raw.userid,
            username: raw.username,
            title: raw.usertitle,
            avatar_url: raw.avatarurl,
            profile_pic_url: raw.profilepicurl,
            profile_url: raw.profileurl,
            signature: raw.signature,
            birthday: raw.birthday,
            display_email: raw.displayemail,
            homepage: raw.homepage,
            join_date: raw.joindate,
            last_activity: raw.lastactivitytime,
            posts: raw.posts,
            age: raw.age,
            note_count: raw.usernotecount,
            can_be_friend: raw.canbefriend,
            has_im_details: raw.hasimdetails,
            online: is_online(&raw.onlinestatus),
            fetched: false,
        }
    }
}

/// `onlinestatus` is an object; online when its own `onlinestatus` is 1
pub(crate) fn is_online(status: &Value) -> bool {
    status.get("onlinestatus").is_some_and(lenient::as_flag)
}

impl Member {
    /// Parse a user record (`prepared`, or a postbit's `post`). Not marked fetched.
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value::<RawMember>(value.clone())
            .map(Member::from)
            .unwrap_or_default()
    }

    /// Parse a `member` payload; the profile lives under `prepared`.
    pub fn from_profile(payload: &Value) -> Option<Self> {
        let prepared = payload.get("prepared").filter(|p| p.is_object())?;
        Some(Self {
            fetched: true,
            ..Self::from_value(prepared)
        })
    }
}

impl ForumClient {
    /// Fetch a member's profile by username.
    pub async fn get_member(&self, username: &str) -> Result<Member> {
        if username.trim().is_empty() {
            return Err(ForumError::InvalidParams("username is required".to_string()));
        }

        let envelope = self
            .call(MethodCall::new("member").param("username", username))
            .await?;
        Member::from_profile(envelope.require_payload("member")?)
            .ok_or_else(|| ForumError::NotFound(format!("member {username}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_member_profile() {
        let member = Member::from_profile(&json!({
            "prepared": {
                "userid": "17",
                "username": "alice",
                "usertitle": "Senior Member",
                "avatarurl": "customavatars/avatar17_1.gif",
                "joindate": "1262304000",
                "lastactivitytime": 1500000000,
                "posts": "1,204",
                "age": "30",
                "usernotecount": "2",
                "canbefriend": 1,
                "hasimdetails": "0",
                "onlinestatus": { "onlinestatus": "1" }
            }
        }))
        .unwrap();

        assert!(member.fetched);
        assert_eq!(member.id, 17);
        assert_eq!(member.title, "Senior Member");
        assert_eq!(member.join_date.map(|t| t.timestamp()), Some(1_262_304_000));
        assert_eq!(member.last_activity.map(|t| t.timestamp()), Some(1_500_000_000));
        // Thousands separators are not numbers
        assert_eq!(member.posts, 0);
        assert_eq!(member.age, 30);
        assert_eq!(member.note_count, 2);
        assert!(member.can_be_friend);
        assert!(!member.has_im_details);
        assert!(member.online);
    }

    #[test]
    fn test_missing_prepared() {
        assert!(Member::from_profile(&json!({ "errormessage": "invalidid" })).is_none());
    }

    #[test]
    fn test_online_status_shapes() {
        assert!(is_online(&json!({ "onlinestatus": 1 })));
        assert!(!is_online(&json!({ "onlinestatus": "0" })));
        assert!(!is_online(&json!("1")));
        assert!(!is_online(&Value::Null));
    }
}
