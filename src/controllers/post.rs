use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, PoisonError, RwLock};

use crate::core::error::Error;
use crate::types::response::Post;

#[derive(Clone, Debug, Default)]
pub struct PostController {
    posts: Arc<RwLock<Vec<Post>>>,
}

impl PostController {
    pub fn new(posts: Vec<Post>) -> Self {
        Self {
            posts: Arc::new(RwLock::new(posts)),
        }
    }

    /// The two posts every fresh server starts with.
    pub fn seeded(author: &str, now: DateTime<Utc>) -> Self {
        Self::new(vec![
            Post {
                id: 1,
                title: "Welcome to the API".into(),
                content: "This is a sample post in our demonstration API".into(),
                author: author.into(),
                created_at: now - Duration::days(1),
            },
            Post {
                id: 2,
                title: "Learning Authentication".into(),
                content: "Today we learn about token-based authentication".into(),
                author: author.into(),
                created_at: now - Duration::hours(2),
            },
        ])
    }

    pub fn list(&self) -> Vec<Post> {
        self.posts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get(&self, id: i32) -> Result<Post, Error> {
        self.posts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|post| post.id == id)
            .cloned()
            .ok_or(Error::PostNotFound)
    }

    pub fn create(
        &self,
        author: &str,
        title: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<Post, Error> {
        if title.trim().is_empty() {
            return Err(Error::InvalidPost("Title must not be empty"));
        }

        let mut posts = self.posts.write().unwrap_or_else(PoisonError::into_inner);

        let post = Post {
            id: posts.iter().map(|post| post.id).max().unwrap_or(0) + 1,
            title: title.to_owned(),
            content: content.to_owned(),
            author: author.to_owned(),
            created_at: now,
        };

        posts.push(post.clone());

        Ok(post)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_posts_get_the_next_id() {
        let posts = PostController::seeded("teacher", Utc::now());

        let post = posts.create("student", "Hello", "First post", Utc::now()).unwrap();

        assert_eq!(post.id, 3);
        assert_eq!(post.author, "student");
        assert_eq!(posts.get(3).unwrap(), post);
        assert_eq!(posts.list().len(), 3);
    }

    #[test]
    fn missing_post_is_not_found() {
        let posts = PostController::default();

        assert!(matches!(posts.get(1), Err(Error::PostNotFound)));
    }

    #[test]
    fn blank_title_is_rejected() {
        let posts = PostController::default();

        assert!(matches!(
            posts.create("student", "  ", "body", Utc::now()),
            Err(Error::InvalidPost(_))
        ));
        assert!(posts.list().is_empty());
    }
}
