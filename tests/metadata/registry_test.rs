#[cfg(test)]
mod tests {
    use nano_orm::prelude::*;
    use std::fs;

    #[test]
    fn test_load_schema() {
        let registry = MetadataRegistry::from_toml_str(
            r#"
[entities.user]
table = "users"
primary_key = "id"
columns = ["name", "manager_id"]

[[entities.user.relations]]
name = "roles"
target = "role"
cardinality = "many_to_many"

[[entities.user.relations]]
name = "manager"
target = "user"
cardinality = "many_to_one"
loading = "lazy"
foreign_key = "manager_id"

[entities.role]
primary_key = "code"
"#,
        )
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.entity_names(), vec!["role", "user"]);

        let user = registry.entity("user").unwrap();
        assert_eq!(user.table(), "users");
        assert_eq!(user.columns(), &["id", "name", "manager_id"]);

        let roles = user.relation("roles").unwrap();
        assert_eq!(roles.cardinality(), Cardinality::ManyToMany);
        assert!(roles.is_eager());

        let manager = user.relation("manager").unwrap();
        assert_eq!(manager.loading(), Loading::Lazy);
        assert_eq!(manager.foreign_key(), Some("manager_id"));

        let role = registry.entity("role").unwrap();
        assert_eq!(role.table(), "role");
        assert_eq!(role.columns(), &["code"]);
    }

    #[test]
    fn test_target_of() {
        let registry = MetadataRegistry::new()
            .with_entity(
                EntityMetadata::new("user", "id")
                    .with_column("manager_id")
                    .with_relation(Relation::one_to_many("posts", "post"))
                    .with_relation(Relation::many_to_one("manager", "user").lazy_via("manager_id")),
            )
            .with_entity(EntityMetadata::new("post", "id").with_table("posts"));
        let user = registry.entity("user").unwrap();

        let posts = registry.target_of(user.relation("posts").unwrap()).unwrap();
        assert_eq!(posts.table(), "posts");

        let manager = registry.target_of(user.relation("manager").unwrap()).unwrap();
        assert_eq!(manager, user);

        let dangling = Relation::one_to_one("avatar", "avatar");
        assert!(matches!(
            registry.target_of(&dangling),
            Err(SchemaError::UnknownEntity(name)) if name == "avatar"
        ));
    }

    #[test]
    fn test_unknown_target() {
        let err = MetadataRegistry::from_toml_str(
            r#"
[entities.user]
primary_key = "id"

[[entities.user.relations]]
name = "posts"
target = "post"
cardinality = "one_to_many"
"#,
        )
        .unwrap_err();

        insta::assert_snapshot!(
            err.to_string(),
            @"relation 'posts' on 'user' targets unknown entity 'post'"
        );
    }

    #[test]
    fn test_missing_foreign_key() {
        let err = MetadataRegistry::from_toml_str(
            r#"
[entities.user]
primary_key = "id"

[[entities.user.relations]]
name = "team"
target = "team"
cardinality = "many_to_one"
loading = "lazy"

[entities.team]
primary_key = "id"
"#,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            SchemaError::MissingForeignKey { entity, relation } if entity == "user" && relation == "team"
        ));
    }

    #[test]
    fn test_eager_cycle() {
        let err = MetadataRegistry::from_toml_str(
            r#"
[entities.user]
primary_key = "id"

[[entities.user.relations]]
name = "posts"
target = "post"
cardinality = "one_to_many"

[entities.post]
primary_key = "id"

[[entities.post.relations]]
name = "author"
target = "user"
cardinality = "many_to_one"
"#,
        )
        .unwrap_err();

        let SchemaError::EagerCycle(path) = err else {
            panic!("expected an eager cycle, got {:?}", err);
        };
        assert_eq!(path.len(), 3);
        assert_eq!(path.first(), path.last());
        assert!(path.contains(&"post".to_string()));
    }

    #[test]
    fn test_lazy_back_reference_is_valid() {
        let registry = MetadataRegistry::from_toml_str(
            r#"
[entities.user]
primary_key = "id"

[[entities.user.relations]]
name = "posts"
target = "post"
cardinality = "one_to_many"

[entities.post]
primary_key = "id"
columns = ["author_id"]

[[entities.post.relations]]
name = "author"
target = "user"
cardinality = "many_to_one"
loading = "lazy"
foreign_key = "author_id"
"#,
        );
        assert!(registry.is_ok());
    }

    #[test]
    fn test_invalid_cardinality() {
        let err = MetadataRegistry::from_toml_str(
            r#"
[entities.user]
primary_key = "id"

[[entities.user.relations]]
name = "posts"
target = "post"
cardinality = "lots"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::Parse(_)));
    }

    #[test]
    fn test_file_not_found() {
        let err = MetadataRegistry::from_file("does/not/exist/schema.toml").unwrap_err();
        assert!(matches!(err, SchemaError::FileNotFound(_)));
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("nano_registry_test_{}.toml", std::process::id()));
        fs::write(&path, "[entities.tag]\nprimary_key = \"id\"\ncolumns = [\"label\"]\n").unwrap();

        let registry = MetadataRegistry::from_file(&path);
        fs::remove_file(&path).unwrap();

        let registry = registry.unwrap();
        assert_eq!(registry.entity("tag").unwrap().columns(), &["id", "label"]);
    }
}
