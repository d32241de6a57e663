use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::{
    parse_macro_input, spanned::Spanned, Attribute, Data, DeriveInput, Fields, Ident, Index, Type,
};

#[proc_macro_derive(NestedSetModel, attributes(nested_set))]
pub fn derive_nested_set_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match impl_nested_set_model(&input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Default)]
struct Options {
    id_field: Option<String>,
    id_type: Option<Type>,
    left_field: Option<String>,
    right_field: Option<String>,
    level_field: Option<String>,
    group_fields: Vec<String>,
    entity_name: Option<String>,
    name_field: Option<String>,
    root_name: Option<String>,
    auto_create_root: Option<bool>,
    advisory_lock: Option<bool>,
}

fn impl_nested_set_model(input: &DeriveInput) -> syn::Result<TokenStream> {
    let struct_ident = &input.ident;

    let data_struct = match &input.data {
        Data::Struct(data) => data,
        _ => {
            return Err(syn::Error::new(
                input.span(),
                "NestedSetModel can only be derived for structs",
            ))
        }
    };

    let mut options = Options::default();
    for attr in &input.attrs {
        if attr.path().is_ident("nested_set") {
            parse_nested_set_attr(attr, &mut options)?;
        }
    }

    let Fields::Named(ref fields) = data_struct.fields else {
        return Err(syn::Error::new(
            data_struct.fields.span(),
            "NestedSetModel requires named fields",
        ));
    };
    let field_type = |name: &str| -> Option<Type> {
        fields
            .named
            .iter()
            .find(|field| field.ident.as_ref().is_some_and(|ident| ident == name))
            .map(|field| field.ty.clone())
    };
    let require_field = |name: &str| -> syn::Result<Type> {
        field_type(name).ok_or_else(|| {
            syn::Error::new(
                struct_ident.span(),
                format!("NestedSetModel field `{name}` not found on struct"),
            )
        })
    };

    let id_field_name = options.id_field.unwrap_or_else(|| "id".to_string());
    let left_field_name = options.left_field.unwrap_or_else(|| "lft".to_string());
    let right_field_name = options.right_field.unwrap_or_else(|| "rgt".to_string());
    let level_field_name = options.level_field.unwrap_or_else(|| "level".to_string());
    let name_field_name = options.name_field.unwrap_or_else(|| "name".to_string());

    let id_type = match options.id_type {
        Some(ty) => ty,
        None => field_type(&id_field_name).ok_or_else(|| {
            syn::Error::new(
                struct_ident.span(),
                "Unable to determine id field type; specify `id_type = ...` in #[nested_set]",
            )
        })?,
    };
    for name in [&left_field_name, &right_field_name, &level_field_name] {
        require_field(name)?;
    }
    let group_types = options
        .group_fields
        .iter()
        .map(|name| require_field(name))
        .collect::<syn::Result<Vec<_>>>()?;

    let id_field_ident = Ident::new(&id_field_name, struct_ident.span());
    let left_field_ident = Ident::new(&left_field_name, struct_ident.span());
    let right_field_ident = Ident::new(&right_field_name, struct_ident.span());
    let level_field_ident = Ident::new(&level_field_name, struct_ident.span());
    let group_field_idents = options
        .group_fields
        .iter()
        .map(|name| Ident::new(name, struct_ident.span()))
        .collect::<Vec<_>>();
    let group_indices = (0..options.group_fields.len())
        .map(Index::from)
        .collect::<Vec<_>>();

    let id_column_variant = format_ident!("{}", to_pascal_case(&id_field_name));
    let left_column_variant = format_ident!("{}", to_pascal_case(&left_field_name));
    let right_column_variant = format_ident!("{}", to_pascal_case(&right_field_name));
    let level_column_variant = format_ident!("{}", to_pascal_case(&level_field_name));
    let group_matches = options
        .group_fields
        .iter()
        .zip(&group_types)
        .zip(&group_indices)
        .map(|((name, ty), index)| {
            let variant = format_ident!("{}", to_pascal_case(name));
            if is_option(ty) {
                quote! {
                    match &group.#index {
                        ::std::option::Option::Some(value) => ::sea_orm::ColumnTrait::eq(
                            &Column::#variant,
                            value.clone(),
                        ),
                        ::std::option::Option::None => {
                            ::sea_orm::ColumnTrait::is_null(&Column::#variant)
                        }
                    }
                }
            } else {
                quote! { ::sea_orm::ColumnTrait::eq(&Column::#variant, group.#index.clone()) }
            }
        })
        .collect::<Vec<_>>();

    let entity_name = options
        .entity_name
        .unwrap_or_else(|| struct_ident.unraw().to_string());
    let entity_name_literal = syn::LitStr::new(&entity_name, struct_ident.span());
    let left_column_literal = syn::LitStr::new(&left_field_name, struct_ident.span());
    let right_column_literal = syn::LitStr::new(&right_field_name, struct_ident.span());
    let level_column_literal = syn::LitStr::new(&level_field_name, struct_ident.span());
    let group_column_literals = options
        .group_fields
        .iter()
        .map(|name| syn::LitStr::new(name, struct_ident.span()))
        .collect::<Vec<_>>();
    let auto_create_root = options.auto_create_root.unwrap_or(true);

    let lock_option = if options.advisory_lock == Some(false) {
        quote! { .advisory_lock_strategy(::nested_set::AdvisoryLockStrategy::Disabled) }
    } else {
        quote! {}
    };

    let prepare_root = match options.root_name {
        Some(root_name) => {
            require_field(&name_field_name)?;
            let name_field_ident = Ident::new(&name_field_name, struct_ident.span());
            let root_name_literal = syn::LitStr::new(&root_name, struct_ident.span());
            quote! {
                active.#name_field_ident =
                    ::sea_orm::ActiveValue::Set(::std::string::String::from(#root_name_literal));
            }
        }
        None => quote! { let _ = active; },
    };

    let generated = quote! {
        impl ::nested_set::NestedSetModel for #struct_ident {
            type Entity = Entity;
            type ActiveModel = ActiveModel;
            type Id = #id_type;
            type Group = (#(#group_types,)*);

            fn nested_set_config() -> &'static ::nested_set::NestedSetConfig {
                static CONFIG: ::once_cell::sync::Lazy<::nested_set::NestedSetConfig> =
                    ::once_cell::sync::Lazy::new(|| {
                        let base = ::nested_set::NestedSetConfig::new(#entity_name_literal);
                        ::nested_set::NestedSetOptions::default()
                            .left_column(#left_column_literal)
                            .right_column(#right_column_literal)
                            .level_column(#level_column_literal)
                            .group_columns({
                                let columns: &[&str] = &[#(#group_column_literals),*];
                                columns.iter().copied()
                            })
                            .auto_create_root(#auto_create_root)
                            #lock_option
                            .apply(base)
                    });
                &CONFIG
            }

            fn id(&self) -> Self::Id {
                self.#id_field_ident.clone()
            }

            fn id_to_value(id: &Self::Id) -> ::sea_orm::Value {
                ::sea_orm::Value::from(id.clone())
            }

            fn bounds(&self) -> ::nested_set::Bounds {
                ::nested_set::Bounds::new(
                    self.#left_field_ident,
                    self.#right_field_ident,
                    self.#level_field_ident,
                )
            }

            fn set_bounds(active: &mut Self::ActiveModel, bounds: ::nested_set::Bounds) {
                active.#left_field_ident = ::sea_orm::ActiveValue::Set(bounds.left);
                active.#right_field_ident = ::sea_orm::ActiveValue::Set(bounds.right);
                active.#level_field_ident = ::sea_orm::ActiveValue::Set(bounds.level);
            }

            fn group(&self) -> Self::Group {
                (#(self.#group_field_idents.clone(),)*)
            }

            #[allow(unused_variables)]
            fn set_group(active: &mut Self::ActiveModel, group: &Self::Group) {
                #(active.#group_field_idents = ::sea_orm::ActiveValue::Set(group.#group_indices.clone());)*
            }

            #[allow(unused_variables)]
            fn group_condition(group: &Self::Group) -> ::sea_orm::Condition {
                ::sea_orm::Condition::all()
                    #(.add(#group_matches))*
            }

            fn prepare_root(active: &mut Self::ActiveModel) {
                #prepare_root
            }

            fn id_column() -> <Self::Entity as ::sea_orm::EntityTrait>::Column {
                Column::#id_column_variant
            }

            fn left_column() -> <Self::Entity as ::sea_orm::EntityTrait>::Column {
                Column::#left_column_variant
            }

            fn right_column() -> <Self::Entity as ::sea_orm::EntityTrait>::Column {
                Column::#right_column_variant
            }

            fn level_column() -> <Self::Entity as ::sea_orm::EntityTrait>::Column {
                Column::#level_column_variant
            }
        }
    };

    Ok(generated.into())
}

fn parse_nested_set_attr(attr: &Attribute, options: &mut Options) -> syn::Result<()> {
    attr.parse_nested_meta(|meta| {
        let ident = meta
            .path
            .get_ident()
            .ok_or_else(|| syn::Error::new(meta.path.span(), "Invalid option key"))?
            .to_string();

        match ident.as_str() {
            "id_field" => {
                let value: syn::LitStr = meta.value()?.parse()?;
                options.id_field = Some(value.value());
            }
            "id_type" => {
                let ty: Type = meta.value()?.parse()?;
                options.id_type = Some(ty);
            }
            "left_field" => {
                let value: syn::LitStr = meta.value()?.parse()?;
                options.left_field = Some(value.value());
            }
            "right_field" => {
                let value: syn::LitStr = meta.value()?.parse()?;
                options.right_field = Some(value.value());
            }
            "level_field" => {
                let value: syn::LitStr = meta.value()?.parse()?;
                options.level_field = Some(value.value());
            }
            "group_fields" => {
                let value: syn::LitStr = meta.value()?.parse()?;
                options.group_fields = value
                    .value()
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            "entity_name" => {
                let value: syn::LitStr = meta.value()?.parse()?;
                options.entity_name = Some(value.value());
            }
            "name_field" => {
                let value: syn::LitStr = meta.value()?.parse()?;
                options.name_field = Some(value.value());
            }
            "root_name" => {
                let value: syn::LitStr = meta.value()?.parse()?;
                options.root_name = Some(value.value());
            }
            "auto_create_root" => {
                let value: syn::LitBool = meta.value()?.parse()?;
                options.auto_create_root = Some(value.value());
            }
            "advisory_lock" => {
                let value: syn::LitBool = meta.value()?.parse()?;
                options.advisory_lock = Some(value.value());
            }
            other => {
                return Err(syn::Error::new(
                    meta.path.span(),
                    format!("Unsupported nested_set option `{other}`"),
                ));
            }
        }

        Ok(())
    })
}

/// `NULL` never compares equal, so optional group columns are matched with `IS NULL`.
fn is_option(ty: &Type) -> bool {
    match ty {
        Type::Path(path) if path.qself.is_none() => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Option"),
        Type::Group(group) => is_option(&group.elem),
        Type::Paren(paren) => is_option(&paren.elem),
        _ => false,
    }
}

fn to_pascal_case(value: &str) -> String {
    value
        .split('_')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
