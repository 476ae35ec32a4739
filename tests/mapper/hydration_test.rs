#[cfg(test)]
mod tests {
    use nano_orm::entity::require_fields;
    use nano_orm::prelude::*;

    /// user ─┬─ posts (1:N) ─┬─ comments (1:N)
    ///       │               └─ tags (N:M)
    ///       ├─ profile (1:1)
    ///       └─ company (N:1, lazy via company_id)
    ///
    /// Positions: user 0, post 1, comment 2, tag 3, profile 4.
    fn blog() -> MetadataRegistry {
        MetadataRegistry::new()
            .with_entity(
                EntityMetadata::new("user", "id")
                    .with_columns(["name", "company_id"])
                    .with_relation(Relation::one_to_many("posts", "post"))
                    .with_relation(Relation::one_to_one("profile", "profile"))
                    .with_relation(Relation::many_to_one("company", "company").lazy_via("company_id")),
            )
            .with_entity(
                EntityMetadata::new("post", "id")
                    .with_columns(["title"])
                    .with_relation(Relation::one_to_many("comments", "comment"))
                    .with_relation(Relation::many_to_many("tags", "tag")),
            )
            .with_entity(EntityMetadata::new("comment", "id").with_columns(["body"]))
            .with_entity(EntityMetadata::new("tag", "id").with_columns(["label"]))
            .with_entity(EntityMetadata::new("profile", "id").with_columns(["bio"]))
            .with_entity(EntityMetadata::new("company", "id").with_columns(["name"]))
    }

    fn row(
        user: i64,
        post: Option<i64>,
        comment: Option<i64>,
        tag: Option<i64>,
        profile: Option<i64>,
    ) -> Row {
        Row::new()
            .with("id_0", user)
            .with("name_0", format!("user {}", user))
            .with("company_id_0", user * 10)
            .with("id_1", post)
            .with("title_1", post.map(|p| format!("post {}", p)))
            .with("id_2", comment)
            .with("body_2", comment.map(|c| format!("comment {}", c)))
            .with("id_3", tag)
            .with("label_3", tag.map(|t| format!("tag {}", t)))
            .with("id_4", profile)
            .with("bio_4", profile.map(|p| format!("bio {}", p)))
    }

    fn keys(entities: &[Entity]) -> Vec<Key> {
        entities.iter().map(|e| e.key().clone()).collect()
    }

    fn ints(values: &[i64]) -> Vec<Key> {
        values.iter().map(|v| Key::Int(*v)).collect()
    }

    fn mapper() -> Mapper {
        Mapper::for_root(&blog(), "user").unwrap()
    }

    #[test]
    fn test_duplicate_rows_collapse() {
        let rows = vec![
            row(1, Some(10), Some(100), Some(1), Some(40)),
            row(1, Some(10), Some(100), Some(1), Some(40)),
        ];
        let users = mapper().map_to_entities(&rows).unwrap();

        assert_eq!(users.len(), 1);
        let posts = users[0].many("posts").unwrap();
        assert_eq!(keys(posts), ints(&[10]));
        assert_eq!(keys(posts[0].many("comments").unwrap()), ints(&[100]));
        assert_eq!(keys(posts[0].many("tags").unwrap()), ints(&[1]));
    }

    #[test]
    fn test_null_branch_is_excluded() {
        let rows = vec![
            row(1, None, None, None, None),
            row(2, Some(20), None, None, None),
        ];
        let users = mapper().map_to_entities(&rows).unwrap();

        assert_eq!(users[0].many("posts"), Some(&[][..]));
        assert_eq!(users[0].one("profile"), Some(None));

        let post = &users[1].many("posts").unwrap()[0];
        assert_eq!(post.many("comments"), Some(&[][..]));
        assert_eq!(post.many("tags"), Some(&[][..]));
    }

    #[test]
    fn test_null_parent_hides_grandchildren_in_same_row() {
        let rows = vec![
            row(1, None, Some(101), Some(2), None).with("body_2", "orphan"),
            row(1, Some(10), Some(100), Some(1), None),
            row(1, Some(10), Some(101), Some(2), None),
        ];
        let users = mapper().map_to_entities(&rows).unwrap();
        let post = &users[0].many("posts").unwrap()[0];

        let comments = post.many("comments").unwrap();
        assert_eq!(keys(comments), ints(&[100, 101]));
        assert_eq!(comments[1].value("body"), Some(&Value::from("comment 101")));
        assert_eq!(keys(post.many("tags").unwrap()), ints(&[1, 2]));
    }

    #[test]
    fn test_one_to_many_keeps_first_seen_order() {
        let rows = vec![
            row(1, Some(12), None, None, None),
            row(1, Some(10), None, None, None),
            row(1, Some(12), None, None, None),
            row(1, Some(11), None, None, None),
        ];
        let users = mapper().map_to_entities(&rows).unwrap();
        assert_eq!(keys(users[0].many("posts").unwrap()), ints(&[12, 10, 11]));
    }

    #[test]
    fn test_one_to_one_is_unwrapped() {
        let rows = vec![
            row(1, Some(10), None, None, Some(40)),
            row(1, Some(11), None, None, Some(40)),
            row(2, None, None, None, None),
        ];
        let users = mapper().map_to_entities(&rows).unwrap();

        let profile = users[0].one("profile").unwrap().unwrap();
        assert_eq!(profile.key(), &Key::Int(40));
        assert_eq!(profile.value("bio"), Some(&Value::from("bio 40")));

        assert_eq!(users[1].one("profile"), Some(None));
        assert!(users[1].many("profile").is_none());
    }

    #[test]
    fn test_lazy_relation_holds_foreign_key() {
        let rows = vec![
            row(3, None, None, None, None),
            row(4, None, None, None, None).with("company_id_0", Value::Null),
        ];
        let users = mapper().map_to_entities(&rows).unwrap();

        assert_eq!(users[0].value("company"), Some(&Value::Int(30)));
        assert_eq!(users[0].value("company_id"), Some(&Value::Int(30)));
        assert_eq!(users[1].value("company"), Some(&Value::Null));
    }

    #[test]
    fn test_root_order_follows_first_appearance() {
        let rows = vec![
            row(5, Some(50), None, None, None),
            row(3, None, None, None, None),
            row(5, Some(51), None, None, None),
            row(7, None, None, None, None),
        ];
        let users = mapper().map_to_entities(&rows).unwrap();

        assert_eq!(keys(&users), ints(&[5, 3, 7]));
        assert_eq!(keys(users[0].many("posts").unwrap()), ints(&[50, 51]));
    }

    #[test]
    fn test_three_levels() {
        let rows = vec![
            row(1, Some(10), Some(100), None, None),
            row(1, Some(10), Some(101), None, None),
            row(1, Some(11), Some(110), None, None),
        ];
        let users = mapper().map_to_entities(&rows).unwrap();
        let posts = users[0].many("posts").unwrap();

        assert_eq!(keys(posts[0].many("comments").unwrap()), ints(&[100, 101]));
        assert_eq!(keys(posts[1].many("comments").unwrap()), ints(&[110]));
        assert_eq!(
            posts[1].many("comments").unwrap()[0].value("body"),
            Some(&Value::from("comment 110"))
        );
    }

    #[test]
    fn test_many_to_many_child_under_several_parents() {
        let rows = vec![
            row(1, Some(10), None, Some(1), None),
            row(1, Some(11), None, Some(1), None),
            row(1, Some(11), None, Some(2), None),
        ];
        let users = mapper().map_to_entities(&rows).unwrap();
        let posts = users[0].many("posts").unwrap();

        let first = posts[0].many("tags").unwrap();
        let second = posts[1].many("tags").unwrap();
        assert_eq!(keys(first), ints(&[1]));
        assert_eq!(keys(second), ints(&[1, 2]));
        assert_eq!(first[0], second[0]);
    }

    #[test]
    fn test_text_keys() {
        let registry = MetadataRegistry::new()
            .with_entity(
                EntityMetadata::new("country", "code")
                    .with_relation(Relation::one_to_many("cities", "city")),
            )
            .with_entity(EntityMetadata::new("city", "name"));
        let mapper = Mapper::for_root(&registry, "country").unwrap();

        let rows = vec![
            Row::new().with("code_0", "NZ").with("name_1", "Wellington"),
            Row::new().with("code_0", "NZ").with("name_1", "Auckland"),
            Row::new().with("code_0", "FR").with("name_1", "Paris"),
        ];
        let countries = mapper.map_to_entities(&rows).unwrap();

        assert_eq!(keys(&countries), vec![Key::from("NZ"), Key::from("FR")]);
        assert_eq!(
            keys(countries[0].many("cities").unwrap()),
            vec![Key::from("Wellington"), Key::from("Auckland")]
        );
    }

    #[test]
    fn test_integers_above_i64_keep_precision() {
        let registry = MetadataRegistry::new()
            .with_entity(EntityMetadata::new("ledger", "id").with_columns(["total"]));
        let mapper = Mapper::for_root(&registry, "ledger").unwrap();

        let rows = RowSet::from_json_str(
            r#"[
                {"id_0": 9223372036854775808, "total_0": 18446744073709551615},
                {"id_0": 9223372036854775808, "total_0": 18446744073709551615}
            ]"#,
        )
        .unwrap();
        let ledgers = mapper.map_to_entities(rows.rows()).unwrap();

        assert_eq!(ledgers.len(), 1);
        assert_eq!(ledgers[0].key(), &Key::UInt(9_223_372_036_854_775_808));
        assert_eq!(ledgers[0].value("total"), Some(&Value::UInt(u64::MAX)));
        assert_eq!(
            ledgers[0].to_json().unwrap()["id"],
            serde_json::json!(9_223_372_036_854_775_808u64)
        );
    }

    #[test]
    fn test_malformed_row() {
        let broken = Row::new()
            .with("id_0", 1)
            .with("name_0", "user 1")
            .with("company_id_0", 10)
            .with("id_1", 10)
            .with("id_2", Value::Null)
            .with("body_2", Value::Null)
            .with("id_3", Value::Null)
            .with("label_3", Value::Null)
            .with("id_4", Value::Null)
            .with("bio_4", Value::Null);
        let rows = vec![row(1, None, None, None, None), broken];

        let err = mapper().map_to_entities(&rows).unwrap_err();
        assert!(err.is_input_error());
        insta::assert_snapshot!(err.to_string(), @"row 1 is missing column 'title_1' for iteration 1");
    }

    #[test]
    fn test_factory_hook() {
        let factories = FactoryRegistry::new()
            .with_factory(
                "post",
                |meta: &EntityMetadata, key: Key, mut record: Record| -> HydrationResult<Entity> {
                    let count = match record.get("comments") {
                        Some(Field::Many(comments)) => comments.len() as i64,
                        _ => 0,
                    };
                    record.insert("comment_count".into(), Field::Value(Value::Int(count)));
                    Ok(Entity::new(meta.name(), key, record))
                },
            );
        let mapper = mapper().with_factories(factories);

        let rows = vec![
            row(1, Some(10), Some(100), None, None),
            row(1, Some(10), Some(101), None, None),
        ];
        let users = mapper.map_to_entities(&rows).unwrap();
        let post = &users[0].many("posts").unwrap()[0];
        assert_eq!(post.value("comment_count"), Some(&Value::Int(2)));
        assert!(users[0].value("comment_count").is_none());
    }

    #[test]
    fn test_factory_error_propagates() {
        let factories = FactoryRegistry::new().with_factory(
            "comment",
            |meta: &EntityMetadata, key: Key, record: Record| -> HydrationResult<Entity> {
                require_fields(meta, &record, &["body"])?;
                Ok(Entity::new(meta.name(), key, record))
            },
        );
        let mapper = mapper().with_factories(factories);

        let rows = vec![row(1, Some(10), Some(100), None, None).with("body_2", Value::Null)];
        match mapper.map_to_entities(&rows) {
            Err(HydrationError::Factory { entity, .. }) => assert_eq!(entity, "comment"),
            other => panic!("expected factory error, got {:?}", other),
        }
    }

    #[test]
    fn test_from_relations_subset() {
        let registry = blog();
        let user = registry.entity("user").unwrap();
        let post = registry.entity("post").unwrap();
        let relations = vec![
            user.relation("posts").unwrap().clone(),
            post.relation("comments").unwrap().clone(),
        ];
        let mapper = Mapper::from_relations(&registry, "user", &relations).unwrap();

        let rows = vec![Row::new()
            .with("id_0", 1)
            .with("name_0", "user 1")
            .with("company_id_0", 10)
            .with("id_1", 10)
            .with("title_1", "post 10")
            .with("id_2", 100)
            .with("body_2", "comment 100")];
        let users = mapper.map_to_entities(&rows).unwrap();

        let posts = users[0].many("posts").unwrap();
        assert_eq!(keys(posts[0].many("comments").unwrap()), ints(&[100]));
        assert!(posts[0].get("tags").is_none());
        assert!(users[0].get("profile").is_none());
    }

    #[test]
    fn test_json_rows_to_json_graph() {
        let rows = RowSet::from_json_str(
            r#"[
                {"id_0": 1, "name_0": "user 1", "company_id_0": 10,
                 "id_1": 10, "title_1": "post 10", "id_2": 100, "body_2": "comment 100",
                 "id_3": 1, "label_3": "tag 1", "id_4": null, "bio_4": null}
            ]"#,
        )
        .unwrap();
        let users = mapper().map_to_entities(rows.rows()).unwrap();
        let json = serde_json::to_string_pretty(&users[0]).unwrap();

        insta::assert_snapshot!(json, @r#"
        {
          "company": 10,
          "company_id": 10,
          "id": 1,
          "name": "user 1",
          "posts": [
            {
              "comments": [
                {
                  "body": "comment 100",
                  "id": 100
                }
              ],
              "id": 10,
              "tags": [
                {
                  "id": 1,
                  "label": "tag 1"
                }
              ],
              "title": "post 10"
            }
          ],
          "profile": null
        }
        "#);
    }
}
